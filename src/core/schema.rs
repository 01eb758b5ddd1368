//! Model descriptors built from configuration
//!
//! A [`Schema`] is the explicit registry of every exposed model. It is built
//! once at startup from [`ApiConfig`] and never mutated afterwards; handlers
//! receive `Arc<ModelDescriptor>` values out of it.

use crate::config::{ApiConfig, FieldConfig};
use crate::core::error::ConfigError;
use crate::core::field::ScalarType;
use crate::core::pluralize::Pluralizer;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

/// Key under which every entity's identifier is serialized
pub const ID_KEY: &str = "_id";
/// Key of the creation timestamp
pub const CREATED_AT_KEY: &str = "createdAt";
/// Key of the last-modification timestamp
pub const UPDATED_AT_KEY: &str = "updatedAt";

const RESERVED_KEYS: [&str; 3] = [ID_KEY, CREATED_AT_KEY, UPDATED_AT_KEY];

/// Whether a field holds a plain value or points at another model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarType),
    Reference { target: String },
}

/// Read-only description of one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    /// Segment of the reverse route on the target model (references only)
    pub inverse: Option<String>,
}

impl FieldDescriptor {
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference { .. })
    }

    /// Name of the referenced model, if this is a reference
    pub fn target_model(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Reference { target } => Some(target),
            FieldKind::Scalar(_) => None,
        }
    }

    /// Value a full replace resets this field to when the payload omits it
    pub fn zero_value(&self) -> Value {
        match &self.kind {
            FieldKind::Scalar(scalar) => scalar.zero_value(),
            FieldKind::Reference { .. } => Value::Null,
        }
    }
}

/// Read-only description of one model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    /// Lower-cased, pluralized name used as URL segment and storage key
    pub collection_name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ModelDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_reference())
    }
}

/// The registry of all exposed models, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Schema {
    models: IndexMap<String, Arc<ModelDescriptor>>,
}

impl Schema {
    /// Build descriptors for every configured model
    ///
    /// Fails when names are duplicated or invalid, or when two models map to
    /// the same collection. A field whose declared type is neither a scalar
    /// keyword nor a registered model is kept as an `any` scalar and logged,
    /// unless `strict_references` is set, in which case it is an error.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        let mut declared: HashSet<&str> = HashSet::new();
        for model in &config.models {
            check_identifier("model", &model.name)?;
            if !declared.insert(model.name.as_str()) {
                return Err(ConfigError::DuplicateModel {
                    name: model.name.clone(),
                });
            }
        }

        let mut collections: HashMap<String, String> = HashMap::new();
        let mut models = IndexMap::new();

        for model in &config.models {
            let collection_name = Pluralizer::collection_name(&model.name);
            if let Some(first) = collections.get(&collection_name) {
                return Err(ConfigError::DuplicateCollection {
                    collection: collection_name,
                    first: first.clone(),
                    second: model.name.clone(),
                });
            }
            collections.insert(collection_name.clone(), model.name.clone());

            let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(model.fields.len());
            for field in &model.fields {
                check_identifier("field", &field.name)?;
                if RESERVED_KEYS.contains(&field.name.as_str()) {
                    return Err(ConfigError::ReservedField {
                        model: model.name.clone(),
                        field: field.name.clone(),
                    });
                }
                if fields.iter().any(|f| f.name == field.name) {
                    return Err(ConfigError::DuplicateField {
                        model: model.name.clone(),
                        field: field.name.clone(),
                    });
                }

                let kind = resolve_kind(config, &model.name, field, &declared)?;
                fields.push(FieldDescriptor {
                    name: field.name.clone(),
                    inverse: match kind {
                        FieldKind::Reference { .. } => field.inverse.clone(),
                        FieldKind::Scalar(_) => None,
                    },
                    kind,
                    required: field.required,
                    default: field.default.clone(),
                });
            }

            models.insert(
                model.name.clone(),
                Arc::new(ModelDescriptor {
                    name: model.name.clone(),
                    collection_name,
                    fields,
                }),
            );
        }

        Ok(Self { models })
    }

    /// Look up a model by name
    pub fn model(&self, name: &str) -> Option<&Arc<ModelDescriptor>> {
        self.models.get(name)
    }

    /// Iterate models in declaration order
    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelDescriptor>> {
        self.models.values()
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

fn resolve_kind(
    config: &ApiConfig,
    model: &str,
    field: &FieldConfig,
    declared: &HashSet<&str>,
) -> Result<FieldKind, ConfigError> {
    if let Some(scalar) = ScalarType::from_keyword(&field.field_type) {
        return Ok(FieldKind::Scalar(scalar));
    }
    if declared.contains(field.field_type.as_str()) {
        return Ok(FieldKind::Reference {
            target: field.field_type.clone(),
        });
    }
    if config.strict_references {
        return Err(ConfigError::UnresolvedReference {
            model: model.to_string(),
            field: field.name.clone(),
            target: field.field_type.clone(),
        });
    }
    tracing::warn!(
        model,
        field = %field.name,
        declared_type = %field.field_type,
        "field type names no registered model, treating it as an untyped scalar"
    );
    Ok(FieldKind::Scalar(ScalarType::Any))
}

fn check_identifier(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let regex = IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    });
    if regex.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    fn bookstore() -> ApiConfig {
        ApiConfig::default()
            .with_model(ModelConfig::new("Author").field(FieldConfig::new("name", "string")))
            .with_model(
                ModelConfig::new("Book")
                    .field(FieldConfig::new("title", "string"))
                    .field(FieldConfig::new("author", "Author")),
            )
    }

    #[test]
    fn test_descriptors_follow_declaration_order() {
        let schema = Schema::from_config(&bookstore()).unwrap();
        assert_eq!(schema.model_names(), vec!["Author", "Book"]);

        let book = schema.model("Book").unwrap();
        assert_eq!(book.collection_name, "books");
        let names: Vec<_> = book.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["title", "author"]);
    }

    #[test]
    fn test_reference_fields_are_detected() {
        let schema = Schema::from_config(&bookstore()).unwrap();
        let book = schema.model("Book").unwrap();

        let author = book.field("author").unwrap();
        assert!(author.is_reference());
        assert_eq!(author.target_model(), Some("Author"));
        assert_eq!(author.zero_value(), Value::Null);

        let title = book.field("title").unwrap();
        assert_eq!(title.kind, FieldKind::Scalar(ScalarType::String));
        assert_eq!(book.reference_fields().count(), 1);
    }

    #[test]
    fn test_duplicate_collection_fails() {
        let config = ApiConfig::default()
            .with_model(ModelConfig::new("Book"))
            .with_model(ModelConfig::new("book"));

        match Schema::from_config(&config) {
            Err(ConfigError::DuplicateCollection {
                collection,
                first,
                second,
            }) => {
                assert_eq!(collection, "books");
                assert_eq!(first, "Book");
                assert_eq!(second, "book");
            }
            other => panic!("expected DuplicateCollection, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_model_fails() {
        let config = ApiConfig::default()
            .with_model(ModelConfig::new("Book"))
            .with_model(ModelConfig::new("Book"));
        assert!(matches!(
            Schema::from_config(&config),
            Err(ConfigError::DuplicateModel { .. })
        ));
    }

    #[test]
    fn test_duplicate_and_reserved_fields_fail() {
        let duplicate = ApiConfig::default().with_model(
            ModelConfig::new("Book")
                .field(FieldConfig::new("title", "string"))
                .field(FieldConfig::new("title", "string")),
        );
        assert!(matches!(
            Schema::from_config(&duplicate),
            Err(ConfigError::DuplicateField { .. })
        ));

        let reserved = ApiConfig::default()
            .with_model(ModelConfig::new("Book").field(FieldConfig::new("_id", "string")));
        assert!(matches!(
            Schema::from_config(&reserved),
            Err(ConfigError::ReservedField { .. })
        ));
    }

    #[test]
    fn test_invalid_names_fail() {
        let config = ApiConfig::default().with_model(ModelConfig::new("blog posts"));
        assert!(matches!(
            Schema::from_config(&config),
            Err(ConfigError::InvalidName { kind: "model", .. })
        ));
    }

    #[test]
    fn test_unresolved_reference_degrades_to_any() {
        let config = ApiConfig::default().with_model(
            ModelConfig::new("Book").field(FieldConfig::new("publisher", "Publisher")),
        );
        let schema = Schema::from_config(&config).unwrap();
        let field = schema.model("Book").unwrap().field("publisher").unwrap();
        assert_eq!(field.kind, FieldKind::Scalar(ScalarType::Any));
    }

    #[test]
    fn test_unresolved_reference_fails_in_strict_mode() {
        let mut config = ApiConfig::default().with_model(
            ModelConfig::new("Book").field(FieldConfig::new("publisher", "Publisher")),
        );
        config.strict_references = true;
        assert!(matches!(
            Schema::from_config(&config),
            Err(ConfigError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_inverse_is_kept_only_on_references() {
        let config = ApiConfig::default()
            .with_model(ModelConfig::new("Author"))
            .with_model(
                ModelConfig::new("Book")
                    .field(FieldConfig::new("editor", "Author").with_inverse("edited"))
                    .field(FieldConfig::new("title", "string").with_inverse("ignored")),
            );
        let schema = Schema::from_config(&config).unwrap();
        let book = schema.model("Book").unwrap();
        assert_eq!(book.field("editor").unwrap().inverse.as_deref(), Some("edited"));
        assert_eq!(book.field("title").unwrap().inverse, None);
    }
}
