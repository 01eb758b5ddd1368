//! REST API exposure for the framework
//!
//! The REST exposure consumes a `ServerHost` and produces an Axum `Router`.

use super::super::host::ServerHost;
use crate::routes::handlers::route_not_found;
use crate::server::router::build_model_routes;
use anyhow::Result;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Returns a router with:
    /// - Health check routes
    /// - Model routes from the host's route table
    /// - Custom routes
    /// - A JSON 404 fallback and HTTP tracing
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let model_routes = build_model_routes(host.app_state(), &host.routes)?;

        let mut app = Self::health_routes().merge(model_routes);

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app
            .fallback(route_not_found)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())))
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "modelrest"
        }))
    }
}
