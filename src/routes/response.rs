//! Wire representation of stored documents

use crate::core::field::format_timestamp;
use crate::core::schema::{CREATED_AT_KEY, FieldKind, ID_KEY, ModelDescriptor, UPDATED_AT_KEY};
use crate::core::store::Document;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Envelope of list, inverse-list responses
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total: usize,
    pub items: Vec<Value>,
}

/// Body of a successful delete
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// Body of an OPTIONS response
#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub methods: Vec<String>,
}

/// Render a document as a flat JSON object
///
/// Keys come out as `_id`, every declared field in declaration order, then
/// `createdAt` and `updatedAt`. Unset fields are `null`. A reference field is
/// its target's id, or the serialized target when `populated` holds it.
pub fn serialize_document(
    model: &ModelDescriptor,
    document: &Document,
    populated: &HashMap<String, Value>,
) -> Value {
    let mut object = Map::new();
    object.insert(ID_KEY.to_string(), Value::String(document.id.clone()));

    for field in &model.fields {
        let value = match &field.kind {
            FieldKind::Reference { .. } => match populated.get(&field.name) {
                Some(nested) => nested.clone(),
                None => document
                    .reference_id(&field.name)
                    .map(|id| Value::String(id.to_string()))
                    .unwrap_or(Value::Null),
            },
            FieldKind::Scalar(_) => document.value(&field.name),
        };
        object.insert(field.name.clone(), value);
    }

    object.insert(
        CREATED_AT_KEY.to_string(),
        Value::String(format_timestamp(&document.created_at)),
    );
    object.insert(
        UPDATED_AT_KEY.to_string(),
        Value::String(format_timestamp(&document.updated_at)),
    );

    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, FieldConfig, ModelConfig};
    use crate::core::schema::Schema;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn book() -> std::sync::Arc<ModelDescriptor> {
        let config = ApiConfig::default()
            .with_model(ModelConfig::new("Author"))
            .with_model(
                ModelConfig::new("Book")
                    .field(FieldConfig::new("title", "string"))
                    .field(FieldConfig::new("isbn", "string"))
                    .field(FieldConfig::new("author", "Author")),
            );
        Schema::from_config(&config)
            .unwrap()
            .model("Book")
            .unwrap()
            .clone()
    }

    fn document() -> Document {
        let created = DateTime::parse_from_rfc3339("2024-03-01T10:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut fields = Map::new();
        fields.insert("title".into(), json!("Dune"));
        fields.insert("author".into(), json!("a-1"));
        fields.insert("internal".into(), json!("hidden"));
        Document {
            id: "b-1".into(),
            created_at: created,
            updated_at: created,
            fields,
        }
    }

    #[test]
    fn test_flat_object_in_declaration_order() {
        let value = serialize_document(&book(), &document(), &HashMap::new());
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec!["_id", "title", "isbn", "author", "createdAt", "updatedAt"]
        );
        assert_eq!(value["isbn"], Value::Null);
        assert_eq!(value["author"], json!("a-1"));
        assert_eq!(value["createdAt"], json!("2024-03-01T10:00:00.123Z"));
        assert!(value.get("internal").is_none());
    }

    #[test]
    fn test_populated_reference_is_nested() {
        let mut populated = HashMap::new();
        populated.insert("author".to_string(), json!({ "_id": "a-1", "name": "Herbert" }));

        let value = serialize_document(&book(), &document(), &populated);
        assert_eq!(value["author"]["name"], json!("Herbert"));
    }
}
