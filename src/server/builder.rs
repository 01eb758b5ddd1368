//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::host::ServerHost;
use crate::config::{ApiConfig, HttpMethod, ModelConfig};
use crate::core::store::ModelStore;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for creating HTTP servers with auto-registered model routes
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_store(InMemoryStore::new())
///     .with_config(ApiConfig::from_yaml_file("api.yaml")?)
///     .build()?;
/// ```
pub struct ServerBuilder {
    store: Option<Arc<dyn ModelStore>>,
    configs: Vec<ApiConfig>,
    models: Vec<ModelConfig>,
    prefix: Option<String>,
    methods: Option<Vec<HttpMethod>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            store: None,
            configs: Vec::new(),
            models: Vec::new(),
            prefix: None,
            methods: None,
            custom_routes: Vec::new(),
        }
    }

    /// Set the persistence adapter
    ///
    /// Defaults to an empty `InMemoryStore` when the `in-memory` feature is on.
    pub fn with_store(mut self, store: impl ModelStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set an already shared persistence adapter
    pub fn with_shared_store(mut self, store: Arc<dyn ModelStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Add a configuration fragment
    ///
    /// Fragments are merged in the order they were added.
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Register one model
    pub fn register_model(mut self, model: ModelConfig) -> Self {
        self.models.push(model);
        self
    }

    /// Register several models
    pub fn register_models(mut self, models: impl IntoIterator<Item = ModelConfig>) -> Self {
        self.models.extend(models);
        self
    }

    /// Override the URL prefix of the merged configuration
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Override the method allow-list of the merged configuration
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for endpoints that are not derived from a model.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    ///
    /// Fails with a [`ConfigError`](crate::core::error::ConfigError) (wrapped in
    /// `anyhow::Error`) when the models or the route table are invalid.
    pub fn build_host(mut self) -> Result<ServerHost> {
        let config = self.merged_config();
        let store = match self.store.take() {
            Some(store) => store,
            None => default_store()?,
        };

        Ok(ServerHost::from_config(config, store)?)
    }

    /// Build the final REST router
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        RestExposure::build_router(host, custom_routes)
    }

    fn merged_config(&self) -> ApiConfig {
        let mut config = ApiConfig::merge(self.configs.clone());
        config.models.extend(self.models.iter().cloned());
        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if let Some(methods) = &self.methods {
            config.methods = methods.clone();
        }
        config
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    ///
    /// # Example
    ///
    /// ```ignore
    /// ServerBuilder::new()
    ///     .with_config(config)
    ///     .serve("127.0.0.1:3000").await?;
    /// ```
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "in-memory")]
fn default_store() -> Result<Arc<dyn ModelStore>> {
    Ok(Arc::new(crate::storage::InMemoryStore::new()))
}

#[cfg(not(feature = "in-memory"))]
fn default_store() -> Result<Arc<dyn ModelStore>> {
    Err(anyhow::anyhow!(
        "A ModelStore is required. Call .with_store()"
    ))
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::core::error::ConfigError;
    use crate::storage::InMemoryStore;

    fn author() -> ModelConfig {
        ModelConfig::new("Author").field(FieldConfig::new("name", "string"))
    }

    fn book() -> ModelConfig {
        ModelConfig::new("Book")
            .field(FieldConfig::new("title", "string"))
            .field(FieldConfig::new("author", "Author"))
    }

    #[test]
    fn test_build_host_from_registered_models() {
        let host = ServerBuilder::new()
            .with_store(InMemoryStore::new())
            .register_models([author(), book()])
            .build_host()
            .unwrap();
        assert_eq!(host.model_names(), vec!["Author", "Book"]);
        assert_eq!(host.routes.prefix(), "/api/v1/");
    }

    #[test]
    fn test_config_fragments_and_overrides_merge() {
        let host = ServerBuilder::new()
            .with_config(ApiConfig::default().with_model(author()))
            .register_model(book())
            .with_prefix("/v2")
            .with_methods([HttpMethod::Get])
            .build_host()
            .unwrap();
        assert_eq!(host.model_names(), vec!["Author", "Book"]);
        assert_eq!(host.routes.prefix(), "/v2/");
        assert!(
            host.routes
                .entries()
                .iter()
                .all(|e| e.method == HttpMethod::Get)
        );
    }

    #[test]
    fn test_build_fails_on_duplicate_collection() {
        let err = ServerBuilder::new()
            .register_model(ModelConfig::new("Book"))
            .register_model(ModelConfig::new("book"))
            .build()
            .unwrap_err();

        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::DuplicateCollection { collection, .. }) => {
                assert_eq!(collection, "books");
            }
            other => panic!("expected DuplicateCollection, got {:?}", other),
        }
    }

    #[test]
    fn test_build_returns_router() {
        let router = ServerBuilder::new()
            .register_models([author(), book()])
            .build();
        assert!(router.is_ok());
    }
}
