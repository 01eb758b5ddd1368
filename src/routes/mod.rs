//! Route derivation and the generic request handlers

pub mod handlers;
pub mod payload;
pub mod registry;
pub mod response;

pub use handlers::{AppState, ModelContext, OptionsContext, ReferenceContext};
pub use registry::{RouteEntry, RouteKind, RouteTable};
