//! # modelrest
//!
//! Derive a uniform REST API from declared data models.
//!
//! ## Features
//!
//! - **Configuration-Based**: Declare models and fields in YAML or with the `model!` macro
//! - **Derived Routes**: Collection and item routes for every model, CRUD included
//! - **List Querying**: Equality filters, sorting, pagination and reference population
//! - **Reference Navigation**: Fetch the entity a reference points at, or list
//!   every entity pointing at a given one
//! - **Pluggable Storage**: Handlers only talk to the `ModelStore` trait
//! - **Typed Errors**: Every failure renders as a JSON `{ code, message, details }` body
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modelrest::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new()
//!         .with_store(InMemoryStore::new())
//!         .register_models(models! {
//!             Author { name: string [required] },
//!             Book { title: string, isbn: string, author: Author },
//!         })
//!         .serve("127.0.0.1:3000")
//!         .await
//! }
//! ```
//!
//! This exposes, among others, `GET /api/v1/books?filter=author=<id>&sort=-createdAt`,
//! `GET /api/v1/books/{id}/author` and `GET /api/v1/authors/{id}/books`.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod server;
pub mod storage;

#[doc(hidden)]
pub use serde_json as __serde_json;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{ApiError, ApiResult, ConfigError, NotFoundError, PersistenceError, ValidationError},
        field::ScalarType,
        pluralize::Pluralizer,
        query::{QueryPlan, QueryTranslator},
        schema::{FieldDescriptor, FieldKind, ModelDescriptor, Schema},
        store::{Document, ModelStore, Page},
    };

    // === Macros ===
    pub use crate::{model, models};

    // === Routes ===
    pub use crate::routes::{
        handlers::AppState,
        registry::{RouteEntry, RouteKind, RouteTable},
    };

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::{ApiConfig, FieldConfig, HttpMethod, ModelConfig};

    // === Server ===
    pub use crate::server::{RestExposure, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde_json::{Map, Value, json};

    // === Axum ===
    pub use axum::Router;
}
