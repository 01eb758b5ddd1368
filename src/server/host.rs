//! Server host holding everything derived at startup
//!
//! The host owns the configuration, the schema built from it, the route table
//! and the store handle. All of it is immutable once built; exposures only
//! read from it.

use crate::config::ApiConfig;
use crate::core::error::ConfigError;
use crate::core::schema::Schema;
use crate::core::store::ModelStore;
use crate::routes::handlers::AppState;
use crate::routes::registry::RouteTable;
use std::sync::Arc;

/// Host context containing all framework state
///
/// # Example
///
/// ```rust,ignore
/// let host = ServerHost::from_config(config, Arc::new(InMemoryStore::new()))?;
/// let app = RestExposure::build_router(Arc::new(host), vec![])?;
/// ```
pub struct ServerHost {
    /// Merged configuration
    pub config: Arc<ApiConfig>,

    /// Descriptors of every exposed model
    pub schema: Arc<Schema>,

    /// Derived route table
    pub routes: Arc<RouteTable>,

    /// Persistence adapter
    pub store: Arc<dyn ModelStore>,
}

impl ServerHost {
    /// Validate the configuration and derive the schema and route table
    pub fn from_config(config: ApiConfig, store: Arc<dyn ModelStore>) -> Result<Self, ConfigError> {
        let schema = Schema::from_config(&config)?;
        let routes = RouteTable::build(&schema, &config)?;

        tracing::info!(
            models = schema.len(),
            routes = routes.len(),
            prefix = %routes.prefix(),
            "route table built"
        );

        Ok(Self {
            config: Arc::new(config),
            schema: Arc::new(schema),
            routes: Arc::new(routes),
            store,
        })
    }

    /// Names of the exposed models, in declaration order
    pub fn model_names(&self) -> Vec<&str> {
        self.schema.model_names()
    }

    /// Handler state sharing this host's schema, config and store
    pub fn app_state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            schema: self.schema.clone(),
            config: self.config.clone(),
        }
    }
}
