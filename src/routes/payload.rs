//! Request body extraction and validation
//!
//! [`Payload`] is an axum extractor accepting only JSON objects; rejections
//! are rendered as `INVALID_BODY` validation errors. [`PayloadValidator`]
//! then checks the object against a model descriptor and turns it into the
//! field map handed to the store.

use crate::core::error::{ApiError, ApiResult, PersistenceError, ValidationError};
use crate::core::schema::{
    CREATED_AT_KEY, FieldDescriptor, FieldKind, ID_KEY, ModelDescriptor, Schema, UPDATED_AT_KEY,
};
use crate::core::store::ModelStore;
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde_json::{Map, Value};

/// A request body that is a JSON object
#[derive(Debug, Clone)]
pub struct Payload(pub Map<String, Value>);

impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ValidationError::InvalidBody {
                message: rejection.body_text(),
            })?;

        match value {
            Value::Object(map) => Ok(Payload(map)),
            other => Err(ValidationError::InvalidBody {
                message: format!("expected a JSON object, got {}", json_kind(&other)),
            }
            .into()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Which write operation a payload is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Omitted fields get their default (when enabled) or stay unset
    Create,
    /// Omitted fields are reset to their zero value
    Replace,
    /// Omitted fields keep their stored value
    Patch,
}

/// Checks payloads against one model
pub struct PayloadValidator<'a> {
    model: &'a ModelDescriptor,
    schema: &'a Schema,
    store: &'a dyn ModelStore,
    apply_defaults: bool,
}

impl<'a> PayloadValidator<'a> {
    pub fn new(
        model: &'a ModelDescriptor,
        schema: &'a Schema,
        store: &'a dyn ModelStore,
        apply_defaults: bool,
    ) -> Self {
        Self {
            model,
            schema,
            store,
            apply_defaults,
        }
    }

    /// Validate a payload and build the fields to persist
    ///
    /// Keys the model does not declare are dropped. Reference values must be
    /// an id string (or an object carrying `_id`) of an existing entity and are
    /// stored as the bare id.
    pub async fn prepare(
        &self,
        mode: WriteMode,
        mut payload: Map<String, Value>,
    ) -> ApiResult<Map<String, Value>> {
        for key in payload.keys() {
            if self.model.field(key).is_some() {
                continue;
            }
            if matches!(key.as_str(), ID_KEY | CREATED_AT_KEY | UPDATED_AT_KEY) {
                tracing::debug!(model = %self.model.name, key = %key, "ignoring system key in payload");
            } else {
                tracing::warn!(model = %self.model.name, key = %key, "dropping undeclared payload key");
            }
        }

        let mut fields = Map::new();

        for field in &self.model.fields {
            let value = match payload.remove(&field.name) {
                Some(raw) => Some(self.check_value(field, raw).await?),
                None => match mode {
                    WriteMode::Create if self.apply_defaults => match &field.default {
                        Some(default) => Some(self.check_value(field, default.clone()).await?),
                        None => None,
                    },
                    WriteMode::Create | WriteMode::Patch => None,
                    WriteMode::Replace => {
                        if field.required {
                            return Err(missing(field));
                        }
                        Some(field.zero_value())
                    }
                },
            };

            match value {
                Some(Value::Null) if field.required => return Err(missing(field)),
                Some(value) => {
                    fields.insert(field.name.clone(), value);
                }
                None if field.required && mode == WriteMode::Create => {
                    return Err(missing(field));
                }
                None => {}
            }
        }

        Ok(fields)
    }

    async fn check_value(&self, field: &FieldDescriptor, value: Value) -> ApiResult<Value> {
        match &field.kind {
            FieldKind::Scalar(scalar) => {
                let expected = scalar.name();
                scalar.check(value).ok_or_else(|| {
                    ValidationError::InvalidValue {
                        field: field.name.clone(),
                        expected: expected.to_string(),
                    }
                    .into()
                })
            }
            FieldKind::Reference { target } => self.check_reference(field, target, value).await,
        }
    }

    async fn check_reference(
        &self,
        field: &FieldDescriptor,
        target: &str,
        value: Value,
    ) -> ApiResult<Value> {
        let id = match &value {
            Value::Null => return Ok(Value::Null),
            Value::String(id) => id.clone(),
            Value::Object(nested) => match nested.get(ID_KEY).and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => return Err(not_an_id(field, target)),
            },
            _ => return Err(not_an_id(field, target)),
        };

        let Some(target_model) = self.schema.model(target) else {
            return Err(not_an_id(field, target));
        };

        let exists = self
            .store
            .find_by_id(target_model, &id)
            .await
            .map_err(|e| {
                PersistenceError::from_adapter("find_by_id", &target_model.collection_name, e)
            })?
            .is_some();

        if !exists {
            return Err(ValidationError::InvalidReference {
                field: field.name.clone(),
                target: target.to_string(),
                id,
            }
            .into());
        }

        Ok(Value::String(id))
    }
}

fn missing(field: &FieldDescriptor) -> ApiError {
    ValidationError::MissingField {
        field: field.name.clone(),
    }
    .into()
}

fn not_an_id(field: &FieldDescriptor, target: &str) -> ApiError {
    ValidationError::InvalidValue {
        field: field.name.clone(),
        expected: format!("{} id", target),
    }
    .into()
}
