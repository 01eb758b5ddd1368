//! Integration tests for configuration loading and startup validation

use modelrest::prelude::*;
use std::io::Write;

const BOOKSTORE_YAML: &str = r#"
prefix: /api/v1/
models:
  - name: Author
    fields:
      - { name: name, type: string, required: true }
  - name: Book
    fields:
      - { name: title, type: string }
      - { name: author, type: Author }
"#;

fn config_error(result: anyhow::Result<Router>) -> ConfigError {
    let err = result.expect_err("build should fail");
    match err.downcast::<ConfigError>() {
        Ok(config) => config,
        Err(other) => panic!("expected a ConfigError, got {}", other),
    }
}

#[test]
fn test_load_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BOOKSTORE_YAML.as_bytes()).unwrap();

    let config = ApiConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.models.len(), 2);

    let host = ServerBuilder::new().with_config(config).build_host().unwrap();
    assert!(host.routes.find(HttpMethod::Get, "/api/v1/authors/:id/books").is_some());
    assert!(host.routes.find(HttpMethod::Get, "/api/v1/books/:id/author").is_some());
}

#[test]
fn test_missing_file_is_a_parse_error() {
    let err = ApiConfig::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
    match err {
        ConfigError::ParseError { file, .. } => {
            assert_eq!(file.as_deref(), Some("/definitely/not/here.yaml"))
        }
        other => panic!("expected ParseError, got {:?}", other),
    }
}

#[test]
fn test_malformed_yaml_is_a_parse_error() {
    let err = ApiConfig::from_yaml_str("models: [ { name: Book, fields: 3 } ]").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { file: None, .. }));
}

#[test]
fn test_every_model_gets_one_collection_and_one_item_route() {
    let config = ApiConfig::from_yaml_str(BOOKSTORE_YAML).unwrap();
    let host = ServerBuilder::new().with_config(config).build_host().unwrap();

    for model in host.schema.models() {
        let lists: Vec<_> = host
            .routes
            .entries()
            .iter()
            .filter(|e| e.kind == RouteKind::List && e.model == model.name)
            .collect();
        let gets: Vec<_> = host
            .routes
            .entries()
            .iter()
            .filter(|e| e.kind == RouteKind::Get && e.model == model.name)
            .collect();

        assert_eq!(lists.len(), 1);
        assert_eq!(gets.len(), 1);
        assert_eq!(gets[0].path, format!("{}/:id", lists[0].path));
    }
}

#[test]
fn test_colliding_collections_fail_before_any_route_exists() {
    let err = config_error(
        ServerBuilder::new()
            .register_model(model!(Person { name: string }))
            .register_model(model!(PERSON { name: string }))
            .build(),
    );
    match err {
        ConfigError::DuplicateCollection {
            collection,
            first,
            second,
        } => {
            assert_eq!(collection, "persons");
            assert_eq!(first, "Person");
            assert_eq!(second, "PERSON");
        }
        other => panic!("expected DuplicateCollection, got {:?}", other),
    }
}

#[test]
fn test_ambiguous_inverse_routes_fail() {
    let err = config_error(
        ServerBuilder::new()
            .register_models(models! {
                Author { name: string },
                Book { author: Author, editor: Author },
            })
            .build(),
    );
    assert!(matches!(err, ConfigError::RouteCollision { .. }));
}

#[test]
fn test_strict_references() {
    let lenient = ServerBuilder::new()
        .register_model(model!(Book { publisher: Publisher }))
        .build_host()
        .unwrap();
    let field = lenient.schema.model("Book").unwrap().field("publisher").unwrap();
    assert!(!field.is_reference());

    let mut strict = ApiConfig::default().with_model(model!(Book { publisher: Publisher }));
    strict.strict_references = true;
    let err = config_error(ServerBuilder::new().with_config(strict).build());
    assert!(matches!(err, ConfigError::UnresolvedReference { .. }));
}

#[test]
fn test_invalid_names_and_reserved_fields_fail() {
    let reserved = config_error(
        ServerBuilder::new()
            .with_config(
                ApiConfig::default()
                    .with_model(ModelConfig::new("Book").field(FieldConfig::new("createdAt", "date"))),
            )
            .build(),
    );
    assert!(matches!(reserved, ConfigError::ReservedField { .. }));

    let invalid = config_error(
        ServerBuilder::new()
            .register_model(ModelConfig::new("Book").field(FieldConfig::new("first-name", "string")))
            .build(),
    );
    assert!(matches!(invalid, ConfigError::InvalidName { kind: "field", .. }));
}

#[test]
fn test_invalid_prefix_fails() {
    let err = config_error(
        ServerBuilder::new()
            .register_model(model!(Book { title: string }))
            .with_prefix("/api/{version}")
            .build(),
    );
    assert!(matches!(err, ConfigError::InvalidPrefix { .. }));
}

#[test]
fn test_merge_multiple_fragments() {
    let authors = ApiConfig::from_yaml_str(
        r#"
models:
  - name: Author
    fields:
      - { name: name, type: string }
"#,
    )
    .unwrap();
    let books = ApiConfig::from_yaml_str(
        r#"
prefix: /v2/
models:
  - name: Book
    fields:
      - { name: author, type: Author }
"#,
    )
    .unwrap();

    let host = ServerBuilder::new()
        .with_config(authors)
        .with_config(books)
        .build_host()
        .unwrap();
    assert_eq!(host.routes.prefix(), "/v2/");
    assert!(host.routes.find(HttpMethod::Get, "/v2/authors/:id/books").is_some());
}
