//! In-memory implementation of ModelStore for testing and development

use crate::core::query::QueryPlan;
use crate::core::schema::{CREATED_AT_KEY, ModelDescriptor, UPDATED_AT_KEY};
use crate::core::store::{Document, ModelStore, Page};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

type Collection = IndexMap<String, Document>;

/// In-memory store keyed by collection name
///
/// Documents are kept in insertion order, which is the natural order of
/// unsorted listings. Ids are random UUIDs. Timestamps are strictly
/// increasing per store, so sorting by `createdAt` is total even for
/// documents created within the same clock tick. Timestamps are taken while
/// the write lock is held, so insertion order and `createdAt` order agree.
#[derive(Clone)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    clock: Arc<Mutex<DateTime<Utc>>>,
}

impl InMemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            clock: Arc::new(Mutex::new(DateTime::<Utc>::MIN_UTC)),
        }
    }

    /// Number of documents currently stored for a model
    pub fn count(&self, model: &ModelDescriptor) -> Result<usize> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(collections
            .get(&model.collection_name)
            .map_or(0, |c| c.len()))
    }

    fn now(&self) -> Result<DateTime<Utc>> {
        let mut last = self
            .clock
            .lock()
            .map_err(|e| anyhow!("Failed to acquire clock lock: {}", e))?;
        let now = Utc::now().max(*last + Duration::nanoseconds(1));
        *last = now;
        Ok(now)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelStore for InMemoryStore {
    async fn find_by_id(&self, model: &ModelDescriptor, id: &str) -> Result<Option<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(collections
            .get(&model.collection_name)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn find_many(&self, model: &ModelDescriptor, plan: &QueryPlan) -> Result<Page> {
        let collections = self
            .collections
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut matching: Vec<Document> = collections
            .get(&model.collection_name)
            .map(|c| {
                c.values()
                    .filter(|doc| {
                        plan.filter
                            .iter()
                            .all(|(field, expected)| values_equal(&doc.value(field), expected))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(field) = &plan.sort_field {
            matching.sort_by(|a, b| {
                let ordering = compare_documents(a, b, field);
                if plan.sort_descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let total = matching.len();
        Ok(Page {
            items: plan.window(matching),
            total,
        })
    }

    async fn create(&self, model: &ModelDescriptor, fields: Map<String, Value>) -> Result<Document> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let now = self.now()?;
        let document = Document {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            fields,
        };

        collections
            .entry(model.collection_name.clone())
            .or_default()
            .insert(document.id.clone(), document.clone());

        Ok(document)
    }

    async fn replace(
        &self,
        model: &ModelDescriptor,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Option<Document>> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let Some(document) = collections
            .get_mut(&model.collection_name)
            .and_then(|c| c.get_mut(id))
        else {
            return Ok(None);
        };

        document.fields = fields;
        document.updated_at = self.now()?;
        Ok(Some(document.clone()))
    }

    async fn update(
        &self,
        model: &ModelDescriptor,
        id: &str,
        changes: Map<String, Value>,
    ) -> Result<Option<Document>> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let Some(document) = collections
            .get_mut(&model.collection_name)
            .and_then(|c| c.get_mut(id))
        else {
            return Ok(None);
        };

        document.fields.extend(changes);
        document.updated_at = self.now()?;
        Ok(Some(document.clone()))
    }

    async fn delete(&self, model: &ModelDescriptor, id: &str) -> Result<bool> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        Ok(collections
            .get_mut(&model.collection_name)
            .and_then(|c| c.shift_remove(id))
            .is_some())
    }
}

/// Equality with numeric normalization (`1` equals `1.0`)
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

fn compare_documents(a: &Document, b: &Document, field: &str) -> Ordering {
    match field {
        CREATED_AT_KEY => a.created_at.cmp(&b.created_at),
        UPDATED_AT_KEY => a.updated_at.cmp(&b.updated_at),
        _ => compare_values(&a.value(field), &b.value(field)),
    }
}

/// Total order over JSON values: null < booleans < numbers < strings < others
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, FieldConfig, ModelConfig};
    use crate::core::schema::Schema;
    use serde_json::json;

    fn book() -> Arc<ModelDescriptor> {
        let config = ApiConfig::default().with_model(
            ModelConfig::new("Book")
                .field(FieldConfig::new("title", "string"))
                .field(FieldConfig::new("year", "integer")),
        );
        Schema::from_config(&config)
            .unwrap()
            .model("Book")
            .unwrap()
            .clone()
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn seed(store: &InMemoryStore, model: &ModelDescriptor) -> Vec<Document> {
        let mut docs = Vec::new();
        for (title, year) in [("Dune", 1965), ("Anathem", 2008), ("Hyperion", 1989)] {
            docs.push(
                store
                    .create(model, fields(json!({ "title": title, "year": year })))
                    .await
                    .unwrap(),
            );
        }
        docs
    }

    #[tokio::test]
    async fn test_create_and_find_by_id() {
        let store = InMemoryStore::new();
        let model = book();

        let created = store
            .create(&model, fields(json!({ "title": "Dune" })))
            .await
            .unwrap();
        Uuid::parse_str(&created.id).unwrap();
        assert_eq!(created.created_at, created.updated_at);

        let found = store.find_by_id(&model, &created.id).await.unwrap();
        assert_eq!(found, Some(created));
        assert_eq!(store.find_by_id(&model, "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_timestamps_are_strictly_increasing() {
        let store = InMemoryStore::new();
        let model = book();
        let docs = seed(&store, &model).await;
        assert!(docs[0].created_at < docs[1].created_at);
        assert!(docs[1].created_at < docs[2].created_at);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_keep_insertion_and_creation_order_aligned() {
        let store = InMemoryStore::new();
        let model = book();

        let mut tasks = Vec::new();
        for i in 0..64 {
            let store = store.clone();
            let model = model.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .create(&model, fields(json!({ "title": format!("Book {}", i) })))
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let page = store.find_many(&model, &QueryPlan::default()).await.unwrap();
        assert_eq!(page.total, 64);
        assert!(
            page.items
                .windows(2)
                .all(|pair| pair[0].created_at < pair[1].created_at)
        );
    }

    #[tokio::test]
    async fn test_find_many_keeps_insertion_order_without_sort() {
        let store = InMemoryStore::new();
        let model = book();
        seed(&store, &model).await;

        let page = store.find_many(&model, &QueryPlan::default()).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|d| d.value("title")).collect();
        assert_eq!(titles, vec![json!("Dune"), json!("Anathem"), json!("Hyperion")]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_find_many_filters_sorts_and_paginates() {
        let store = InMemoryStore::new();
        let model = book();
        seed(&store, &model).await;

        let plan = QueryPlan {
            sort_field: Some("year".into()),
            sort_descending: true,
            limit: Some(1),
            offset: 1,
            ..QueryPlan::default()
        };
        let page = store.find_many(&model, &plan).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].value("title"), json!("Hyperion"));

        let filtered = QueryPlan::default().scoped_to("year", json!(1965.0));
        let page = store.find_many(&model, &filtered).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].value("title"), json!("Dune"));
    }

    #[tokio::test]
    async fn test_replace_overwrites_and_update_merges() {
        let store = InMemoryStore::new();
        let model = book();
        let created = store
            .create(&model, fields(json!({ "title": "Dune", "year": 1965 })))
            .await
            .unwrap();

        let patched = store
            .update(&model, &created.id, fields(json!({ "title": "Dune Messiah" })))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patched.value("title"), json!("Dune Messiah"));
        assert_eq!(patched.value("year"), json!(1965));
        assert!(patched.updated_at > created.updated_at);
        assert_eq!(patched.created_at, created.created_at);

        let replaced = store
            .replace(&model, &created.id, fields(json!({ "title": "Children of Dune" })))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replaced.value("year"), Value::Null);

        assert_eq!(
            store.update(&model, "missing", Map::new()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();
        let model = book();
        let docs = seed(&store, &model).await;

        assert!(store.delete(&model, &docs[1].id).await.unwrap());
        assert!(!store.delete(&model, &docs[1].id).await.unwrap());
        assert_eq!(store.count(&model).unwrap(), 2);

        let page = store.find_many(&model, &QueryPlan::default()).await.unwrap();
        let titles: Vec<_> = page.items.iter().map(|d| d.value("title")).collect();
        assert_eq!(titles, vec![json!("Dune"), json!("Hyperion")]);
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&Value::Null, &json!("a")), Ordering::Less);
        assert!(values_equal(&json!(3), &json!(3.0)));
        assert!(!values_equal(&json!("3"), &json!(3)));
    }
}
