//! Server lifecycle.
//!
//! [`PortalServer`] wires the configured store, caches and resolver into the
//! API server and drives it until a shutdown signal arrives.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use portal_api::{ApiServer, AppState};
use portal_core::config::{ConfigLoader, StoreBackend};
use portal_core::traits::TenantStore;
use portal_telemetry::logging::{LogConfig, init_logging};
use portal_tenancy::{
    InMemoryTenantStore, TenantResolver, TrustedDomainCache, TrustedDomainSource,
};

use crate::config::{ENV_PREFIX, ServerConfig};
use crate::shutdown::{ShutdownController, setup_signal_handlers};

/// Lifecycle state of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Constructed, nothing built yet.
    Stopped,
    /// Components built, listener not yet bound.
    Ready,
    /// Serving requests.
    Running,
    /// Draining after a shutdown signal.
    ShuttingDown,
}

/// Server lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A component failed to start.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Lifecycle method called out of order.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The API server failed while running.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// The portal tenancy server.
pub struct PortalServer {
    config: ServerConfig,
    state: ServerState,
    shutdown: ShutdownController,
    app: Option<Arc<AppState>>,
    _log_guards: Vec<WorkerGuard>,
}

impl PortalServer {
    /// Creates a server from validated configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: ServerState::Stopped,
            shutdown: ShutdownController::new(),
            app: None,
            _log_guards: Vec::new(),
        }
    }

    /// Loads configuration from `path` with `PORTAL_*` overrides and validates it.
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServerConfig, ServerError> {
        ConfigLoader::new()
            .with_env_prefix(ENV_PREFIX)
            .load(path)
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Shared shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Application state, once initialized.
    #[must_use]
    pub fn app_state(&self) -> Option<&Arc<AppState>> {
        self.app.as_ref()
    }

    /// Initializes logging and builds every component.
    pub async fn initialize(&mut self) -> Result<(), ServerError> {
        self.init_logging()?;
        self.build().await
    }

    fn init_logging(&mut self) -> Result<(), ServerError> {
        let log_config = LogConfig::from(&self.config.portal.logging);
        self._log_guards = init_logging(&log_config).map_err(|e| {
            ServerError::Initialization(format!("Failed to initialize logging: {e}"))
        })?;
        info!(level = %log_config.level, "Logging initialized");
        Ok(())
    }

    /// Builds the store, caches and resolver without touching global logging.
    pub async fn build(&mut self) -> Result<(), ServerError> {
        if self.state != ServerState::Stopped {
            return Err(ServerError::InvalidState(
                "Server must be stopped to initialize".to_string(),
            ));
        }
        info!(name = %self.config.server.name, "Initializing portal server");

        let store = self.build_store()?;
        let tenancy = &self.config.tenancy;
        let trusted = Arc::new(TrustedDomainCache::new(Arc::clone(&store), tenancy));

        match trusted.refresh(true).await {
            Ok(snapshot) => info!(
                origins = snapshot.len(),
                tenants = snapshot.tenant_count(),
                "Trusted domains warmed"
            ),
            Err(e) => warn!(error = %e, "Trusted-domain warm-up failed; will retry on demand"),
        }

        let resolver = Arc::new(TenantResolver::new(tenancy, store, trusted));
        self.app = Some(Arc::new(AppState::new(self.config.api_config(), resolver)));
        self.state = ServerState::Ready;
        Ok(())
    }

    fn build_store(&self) -> Result<Arc<dyn TenantStore>, ServerError> {
        let store_config = &self.config.portal.store;
        let store = match store_config.backend {
            StoreBackend::Memory => match &store_config.seed_file {
                Some(path) => InMemoryTenantStore::from_seed_file(path)
                    .map_err(|e| ServerError::Initialization(e.to_string()))?,
                None => {
                    warn!("No tenant seed file configured; starting with an empty store");
                    InMemoryTenantStore::new()
                }
            },
        };
        info!(
            backend = store.backend_name(),
            tenants = store.len(),
            "Tenant store ready"
        );
        Ok(Arc::new(store))
    }

    /// Serves until SIGINT/SIGTERM, then drains in-flight requests for at
    /// most `shutdown.timeout_secs`.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let Some(app) = self.app.take() else {
            return Err(ServerError::InvalidState(
                "Server must be initialized before running".to_string(),
            ));
        };

        let signals = self.shutdown.clone();
        tokio::spawn(async move {
            setup_signal_handlers(signals).await;
        });

        self.serve(app).await
    }

    async fn serve(&mut self, app: Arc<AppState>) -> Result<(), ServerError> {
        self.state = ServerState::Running;
        info!(
            name = %self.config.server.name,
            address = %app.config.bind_address(),
            "Portal server running"
        );

        let shutdown = self.shutdown.clone();
        let api = ApiServer::new(app).run_with_shutdown(async move {
            shutdown.wait_for_shutdown().await;
        });

        let drain = self.config.shutdown.timeout();
        let shutdown = self.shutdown.clone();
        let deadline = async move {
            shutdown.wait_for_shutdown().await;
            tokio::time::sleep(drain).await;
        };

        tokio::select! {
            result = api => {
                result.map_err(|e| ServerError::Runtime(e.to_string()))?;
            }
            () = deadline => {
                warn!(timeout_secs = drain.as_secs(), "Drain timeout elapsed; closing remaining connections");
            }
        }

        self.state = ServerState::ShuttingDown;
        info!("Portal server stopped");
        Ok(())
    }
}
