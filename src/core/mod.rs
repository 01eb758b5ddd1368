//! Core module containing the schema, query and storage contracts

pub mod error;
pub mod field;
pub mod pluralize;
pub mod query;
pub mod schema;
pub mod store;

pub use error::{ApiError, ApiResult, ConfigError, NotFoundError, PersistenceError, ValidationError};
pub use field::ScalarType;
pub use pluralize::Pluralizer;
pub use query::{QueryPlan, QueryTranslator};
pub use schema::{FieldDescriptor, FieldKind, ModelDescriptor, Schema};
pub use store::{Document, ModelStore, Page};
