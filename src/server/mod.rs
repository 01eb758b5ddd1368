//! Server module for building HTTP servers with auto-registered routes
//!
//! This module provides a `ServerBuilder` that derives the schema and route
//! table from the configuration and exposes them over REST.

pub mod builder;
pub mod exposure;
pub mod host;
pub mod router;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use host::ServerHost;
