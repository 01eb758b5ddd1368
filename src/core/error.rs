//! Typed error handling for modelrest
//!
//! Every failure the framework can produce belongs to one of four categories:
//!
//! - [`ConfigError`]: invalid model declarations or route table, fatal at startup
//! - [`ValidationError`]: bad query parameters or payloads, request-scoped (400)
//! - [`NotFoundError`]: missing entities, references or routes (404)
//! - [`PersistenceError`]: failures reported by the storage adapter (500)
//!
//! They are unified under [`ApiError`], which renders itself as a JSON
//! [`ErrorResponse`] so handlers can simply return `Result<_, ApiError>`.
//!
//! # Example
//!
//! ```rust,ignore
//! match result {
//!     Err(ApiError::NotFound(NotFoundError::Entity { model, id })) => {
//!         println!("{} {} is gone", model, id);
//!     }
//!     Err(e) => eprintln!("{} ({})", e, e.error_code()),
//!     Ok(_) => {}
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Convenience alias for request-scoped results
pub type ApiResult<T> = Result<T, ApiError>;

/// The main error type of the framework
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration errors (only produced while building the server)
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Missing entities or routes
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Storage adapter errors
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::Validation(e) => e.error_code(),
            ApiError::NotFound(e) => e.error_code(),
            ApiError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::NotFound(NotFoundError::Entity { model, id }) => Some(serde_json::json!({
                "model": model,
                "id": id,
            })),
            ApiError::NotFound(NotFoundError::Reference { model, id, field }) => {
                Some(serde_json::json!({
                    "model": model,
                    "id": id,
                    "field": field,
                }))
            }
            ApiError::Validation(ValidationError::UnknownField { model, field, .. }) => {
                Some(serde_json::json!({ "model": model, "field": field }))
            }
            ApiError::Validation(ValidationError::InvalidValue { field, .. })
            | ApiError::Validation(ValidationError::MissingField { field })
            | ApiError::Validation(ValidationError::InvalidReference { field, .. }) => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors detected while turning the configuration into a schema and route table
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration document
    #[error("Failed to parse config{}: {message}", file_suffix(.file))]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Two models share the same name
    #[error("Model '{name}' is declared more than once")]
    DuplicateModel { name: String },

    /// Two models pluralize to the same collection name
    #[error("Models '{first}' and '{second}' both map to collection '{collection}'")]
    DuplicateCollection {
        collection: String,
        first: String,
        second: String,
    },

    /// A model declares the same field twice
    #[error("Field '{field}' is declared more than once on model '{model}'")]
    DuplicateField { model: String, field: String },

    /// A model declares a field whose key is reserved for system values
    #[error("Field '{field}' on model '{model}' uses a reserved name")]
    ReservedField { model: String, field: String },

    /// A model or field name is not a valid identifier
    #[error("Invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    /// A field's declared type names no scalar type and no registered model
    #[error("Field '{field}' on model '{model}' references unknown model '{target}'")]
    UnresolvedReference {
        model: String,
        field: String,
        target: String,
    },

    /// Two route entries share the same method and path
    #[error("Route collision on {method} {path}")]
    RouteCollision { method: String, path: String },

    /// The URL prefix is unusable
    #[error("Invalid URL prefix '{prefix}'")]
    InvalidPrefix { prefix: String },
}

fn file_suffix(file: &Option<String>) -> String {
    file.as_ref()
        .map(|f| format!(" file '{}'", f))
        .unwrap_or_default()
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors caused by the request's query string or body
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A query or payload mentions a field the model does not declare
    #[error("Unknown field '{field}' on model '{model}' in {context}")]
    UnknownField {
        model: String,
        field: String,
        context: &'static str,
    },

    /// The `filter` parameter is malformed
    #[error("Invalid filter expression '{expression}': {message}")]
    InvalidFilter { expression: String, message: String },

    /// `limit` or `offset` is not a non-negative integer
    #[error("Invalid value '{value}' for '{param}': expected a non-negative integer")]
    InvalidPagination { param: &'static str, value: String },

    /// `populate` names a field that is not a reference
    #[error("Field '{field}' cannot be populated: it is not a reference")]
    NotAReference { field: String },

    /// A value does not match the field's declared type
    #[error("Invalid value for field '{field}': expected {expected}")]
    InvalidValue { field: String, expected: String },

    /// A required field is absent
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    /// A reference field points at an entity that does not exist
    #[error("Field '{field}' references missing {target} '{id}'")]
    InvalidReference {
        field: String,
        target: String,
        id: String,
    },

    /// The request body is not a JSON object
    #[error("Invalid body: {message}")]
    InvalidBody { message: String },
}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::UnknownField { .. } => "UNKNOWN_FIELD",
            ValidationError::InvalidFilter { .. } => "INVALID_FILTER",
            ValidationError::InvalidPagination { .. } => "INVALID_PAGINATION",
            ValidationError::NotAReference { .. } => "NOT_A_REFERENCE",
            ValidationError::InvalidValue { .. } => "INVALID_VALUE",
            ValidationError::MissingField { .. } => "MISSING_FIELD",
            ValidationError::InvalidReference { .. } => "INVALID_REFERENCE",
            ValidationError::InvalidBody { .. } => "INVALID_BODY",
        }
    }
}

// =============================================================================
// Not Found Errors
// =============================================================================

/// Errors for lookups that found nothing
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// No entity with this id
    #[error("{model} with id '{id}' not found")]
    Entity { model: String, id: String },

    /// The entity exists but its reference is empty or dangling
    #[error("Reference '{field}' of {model} '{id}' not found")]
    Reference {
        model: String,
        id: String,
        field: String,
    },

    /// No route is registered for this method and path
    #[error("No route for {method} {path}")]
    Route { method: String, path: String },
}

impl NotFoundError {
    pub fn error_code(&self) -> &'static str {
        match self {
            NotFoundError::Entity { .. } => "ENTITY_NOT_FOUND",
            NotFoundError::Reference { .. } => "REFERENCE_NOT_FOUND",
            NotFoundError::Route { .. } => "ROUTE_NOT_FOUND",
        }
    }
}

// =============================================================================
// Persistence Errors
// =============================================================================

/// A storage adapter call failed
#[derive(Debug, Error)]
#[error("Storage {operation} on '{collection}' failed: {message}")]
pub struct PersistenceError {
    pub operation: &'static str,
    pub collection: String,
    pub message: String,
}

impl PersistenceError {
    /// Wrap an adapter error, logging it once at the handler boundary
    pub fn from_adapter(
        operation: &'static str,
        collection: &str,
        source: anyhow::Error,
    ) -> Self {
        tracing::error!(
            operation,
            collection,
            error = %source,
            "persistence adapter call failed"
        );
        Self {
            operation,
            collection: collection.to_string(),
            message: source.to_string(),
        }
    }
}
