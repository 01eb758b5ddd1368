//! Bookstore demo
//!
//! Serves the models declared in `bookstore.yaml` from an in-memory store.
//!
//! ```text
//! cargo run --example bookstore
//! curl -X POST localhost:3000/api/v1/authors -H 'content-type: application/json' -d '{"name":"Ursula K. Le Guin"}'
//! curl 'localhost:3000/api/v1/books?sort=-createdAt&limit=10&populate=author'
//! curl localhost:3000/api/v1/authors/<id>/books
//! ```
//!
//! `BOOKSTORE_CONFIG` overrides the config path and `BOOKSTORE_ADDR` the bind
//! address. Log verbosity follows `RUST_LOG`.

use modelrest::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/bookstore/bookstore.yaml");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,modelrest=debug")),
        )
        .init();

    let path = std::env::var("BOOKSTORE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let addr = std::env::var("BOOKSTORE_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    let config = ApiConfig::from_yaml_file(&path)?;
    tracing::info!(
        config = %path,
        models = config.models.len(),
        "loaded bookstore configuration"
    );

    ServerBuilder::new()
        .with_store(InMemoryStore::new())
        .with_config(config)
        .register_model(model!(Review {
            book: Book,
            rating: integer [required],
            body: string,
        }))
        .serve(&addr)
        .await
}
