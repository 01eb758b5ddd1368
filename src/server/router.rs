//! Binding of the route table to axum

use crate::core::error::ConfigError;
use crate::core::schema::ModelDescriptor;
use crate::routes::handlers::{
    self, AppState, ModelContext, OptionsContext, ReferenceContext, route_not_found,
};
use crate::routes::registry::{RouteEntry, RouteKind, RouteTable};
use axum::{
    Extension, Router,
    handler::Handler,
    http::{HeaderValue, header},
    routing::{MethodFilter, MethodRouter},
};
use indexmap::IndexMap;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

/// Content type of every model route response
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Build model routes from the route table
///
/// Entries sharing a path are grouped into one method router. Methods that
/// are not registered on a known path fall through to the JSON 404 handler,
/// like unknown paths do.
pub fn build_model_routes(state: AppState, routes: &RouteTable) -> Result<Router, ConfigError> {
    let mut by_path: IndexMap<String, MethodRouter<AppState>> = IndexMap::new();

    for entry in routes.entries() {
        let path = entry.axum_path();
        let method_router = by_path.shift_remove(&path).unwrap_or_else(MethodRouter::new);
        let method_router = bind(&state, routes, entry, method_router)?;
        tracing::debug!(method = %entry.method, path = %entry.path, kind = ?entry.kind, "registered route");
        by_path.insert(path, method_router);
    }

    let mut router = Router::new();
    for (path, method_router) in by_path {
        router = router.route(&path, method_router.fallback(route_not_found));
    }

    Ok(router
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        ))
        .with_state(state))
}

fn bind(
    state: &AppState,
    routes: &RouteTable,
    entry: &RouteEntry,
    method_router: MethodRouter<AppState>,
) -> Result<MethodRouter<AppState>, ConfigError> {
    let model = lookup(state, &entry.model)?;

    let bound = match entry.kind {
        RouteKind::List => method_router.on(
            MethodFilter::GET,
            handlers::list.layer(Extension(Arc::new(ModelContext { model }))),
        ),
        RouteKind::Get => method_router.on(
            MethodFilter::GET,
            handlers::get_one.layer(Extension(Arc::new(ModelContext { model }))),
        ),
        RouteKind::Create => method_router.on(
            MethodFilter::POST,
            handlers::create.layer(Extension(Arc::new(ModelContext { model }))),
        ),
        RouteKind::Replace => method_router.on(
            MethodFilter::PUT,
            handlers::replace.layer(Extension(Arc::new(ModelContext { model }))),
        ),
        RouteKind::Patch => method_router.on(
            MethodFilter::PATCH,
            handlers::patch.layer(Extension(Arc::new(ModelContext { model }))),
        ),
        RouteKind::Delete => method_router.on(
            MethodFilter::DELETE,
            handlers::delete.layer(Extension(Arc::new(ModelContext { model }))),
        ),
        RouteKind::Options => {
            let methods = routes.methods_for_path(&entry.path);
            method_router.on(
                MethodFilter::OPTIONS,
                handlers::options.layer(Extension(Arc::new(OptionsContext { methods }))),
            )
        }
        RouteKind::GetRef => method_router.on(
            MethodFilter::GET,
            handlers::get_ref.layer(Extension(reference_context(state, entry, model)?)),
        ),
        RouteKind::ListRef => method_router.on(
            MethodFilter::GET,
            handlers::list_ref.layer(Extension(reference_context(state, entry, model)?)),
        ),
    };

    Ok(bound)
}

fn reference_context(
    state: &AppState,
    entry: &RouteEntry,
    model: Arc<ModelDescriptor>,
) -> Result<Arc<ReferenceContext>, ConfigError> {
    let (Some(field), Some(related)) = (&entry.ref_field, &entry.related_model) else {
        return Err(ConfigError::UnresolvedReference {
            model: entry.model.clone(),
            field: entry.ref_field.clone().unwrap_or_default(),
            target: entry.related_model.clone().unwrap_or_default(),
        });
    };

    Ok(Arc::new(ReferenceContext {
        model,
        field: field.clone(),
        related: lookup(state, related)?,
    }))
}

fn lookup(state: &AppState, name: &str) -> Result<Arc<ModelDescriptor>, ConfigError> {
    state
        .schema
        .model(name)
        .cloned()
        .ok_or_else(|| ConfigError::UnresolvedReference {
            model: name.to_string(),
            field: String::new(),
            target: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, FieldConfig, HttpMethod, ModelConfig};
    use crate::core::schema::Schema;
    use crate::storage::InMemoryStore;

    fn state(config: ApiConfig) -> (AppState, RouteTable) {
        let schema = Schema::from_config(&config).unwrap();
        let routes = RouteTable::build(&schema, &config).unwrap();
        let state = AppState {
            store: Arc::new(InMemoryStore::new()),
            schema: Arc::new(schema),
            config: Arc::new(config),
        };
        (state, routes)
    }

    #[test]
    fn test_builds_router_for_every_entry() {
        let (state, routes) = state(
            ApiConfig::default()
                .with_model(ModelConfig::new("Author"))
                .with_model(ModelConfig::new("Book").field(FieldConfig::new("author", "Author"))),
        );
        assert!(build_model_routes(state, &routes).is_ok());
    }

    #[test]
    fn test_entry_for_unknown_model_is_rejected() {
        let (state, _) = state(ApiConfig::default().with_model(ModelConfig::new("Author")));
        let stray = RouteTable::build(
            &Schema::from_config(&ApiConfig::default().with_model(ModelConfig::new("Ghost")))
                .unwrap(),
            &ApiConfig::default().with_methods([HttpMethod::Get]),
        )
        .unwrap();

        assert!(matches!(
            build_model_routes(state, &stray),
            Err(ConfigError::UnresolvedReference { .. })
        ));
    }
}
