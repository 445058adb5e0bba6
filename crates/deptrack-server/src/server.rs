use std::sync::Arc;

use tokio::net::TcpListener;

use deptrack_services::{DependencyService, RegistryService, TopologyService};
use deptrack_store::{
    Backend, DatabaseConfig, GraphStore, StatementOverrides, Statements,
};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Shared handler state: the domain services over one graph store.
pub struct AppState {
    pub dependency: DependencyService,
    pub topology: TopologyService,
    pub registry: RegistryService,
}

impl AppState {
    pub fn new(store: Arc<GraphStore>) -> Arc<Self> {
        Arc::new(Self {
            dependency: DependencyService::new(Arc::clone(&store)),
            topology: TopologyService::new(Arc::clone(&store)),
            registry: RegistryService::new(store),
        })
    }
}

/// deptrack REST server.
pub struct DeptrackServer {
    config: ServerConfig,
}

impl DeptrackServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Resolve the backend, load statements, open pools, and build the
    /// services. Fails before serving anything if the backend name is
    /// unknown or the statement-override document is malformed.
    pub async fn build_state(config: &ServerConfig) -> ServerResult<Arc<AppState>> {
        let backend: Backend = config.backend.parse()?;

        let mut statements = Statements::defaults(backend);
        if let Some(path) = &config.statements_file {
            statements = statements.with_overrides(StatementOverrides::load_file(path)?);
        }

        let mut db = DatabaseConfig::new(backend).max_connections(config.max_connections);
        if let Some(dsn) = &config.rw_dsn {
            db = db.rw_dsn(dsn);
        }
        if let Some(dsn) = &config.ro_dsn {
            db = db.ro_dsn(dsn);
        }
        let pools = db.connect().await?;

        let store = Arc::new(GraphStore::new(backend, pools, statements).await?);
        Ok(AppState::new(store))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let state = Self::build_state(&self.config).await?;
        let app = build_router(state);
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("deptrack server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
