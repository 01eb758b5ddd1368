//! Persistence adapter contract
//!
//! The framework never talks to a database directly. Every handler goes
//! through a [`ModelStore`], which receives the model descriptor of the
//! collection it should operate on and plain JSON field maps.

use crate::core::field::format_timestamp;
use crate::core::query::QueryPlan;
use crate::core::schema::{CREATED_AT_KEY, ID_KEY, ModelDescriptor, UPDATED_AT_KEY};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// One stored entity as seen by the framework
///
/// `id` is whatever identifier the adapter uses natively; it is always
/// rendered under the `_id` key on the wire. Reference fields hold the
/// referenced entity's id as a JSON string (or `null`).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Value of a declared field or system key, as used for filtering
    pub fn value(&self, key: &str) -> Value {
        match key {
            ID_KEY => Value::String(self.id.clone()),
            CREATED_AT_KEY => Value::String(format_timestamp(&self.created_at)),
            UPDATED_AT_KEY => Value::String(format_timestamp(&self.updated_at)),
            _ => self.fields.get(key).cloned().unwrap_or(Value::Null),
        }
    }

    /// Identifier stored in a reference field, if set
    pub fn reference_id(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            Value::String(id) => Some(id.as_str()),
            Value::Object(nested) => nested.get(ID_KEY).and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Result of a list query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// The requested window of matching documents
    pub items: Vec<Document>,
    /// Number of matching documents before offset and limit were applied
    pub total: usize,
}

/// Storage operations the request handlers rely on
///
/// Lookups of missing ids are not errors: they return `None` (or `false` for
/// deletes) and the handlers turn them into 404 responses. `Err` is reserved
/// for genuine storage failures. Implementations may suspend freely; the
/// framework imposes no timeouts and performs no retries.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Get a document by id
    async fn find_by_id(&self, model: &ModelDescriptor, id: &str) -> Result<Option<Document>>;

    /// Filter, sort and paginate a collection
    ///
    /// `Page::total` counts every document matching `plan.filter`, ignoring
    /// `plan.limit` and `plan.offset`.
    async fn find_many(&self, model: &ModelDescriptor, plan: &QueryPlan) -> Result<Page>;

    /// Insert a new document with a fresh id and timestamps
    async fn create(&self, model: &ModelDescriptor, fields: Map<String, Value>) -> Result<Document>;

    /// Overwrite every field of a document
    async fn replace(
        &self,
        model: &ModelDescriptor,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Option<Document>>;

    /// Overwrite only the given fields of a document
    async fn update(
        &self,
        model: &ModelDescriptor,
        id: &str,
        changes: Map<String, Value>,
    ) -> Result<Option<Document>>;

    /// Remove a document, returning whether it existed
    async fn delete(&self, model: &ModelDescriptor, id: &str) -> Result<bool>;

    /// Resolve the document a reference field points at
    ///
    /// `target` is the descriptor of the referenced model. The default
    /// implementation is a plain lookup by the stored id; adapters with native
    /// joins can override it.
    async fn populate(
        &self,
        target: &ModelDescriptor,
        document: &Document,
        field: &str,
    ) -> Result<Option<Document>> {
        match document.reference_id(field) {
            Some(id) => self.find_by_id(target, id).await,
            None => Ok(None),
        }
    }
}
