//! API server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::routes::create_router;
use crate::state::AppState;

/// API server.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a server around prepared state.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    async fn bind(&self) -> Result<TcpListener, ApiError> {
        let addr = self.state.config.bind_address();
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| ApiError::Internal(format!("Invalid bind address: {e}")))?;
        let listener = TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to bind to {addr}: {e}")))?;
        info!(address = %addr, "API server listening");
        Ok(listener)
    }

    /// Runs the API server until the process exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or run.
    pub async fn run(self) -> Result<(), ApiError> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Runs the API server, draining in-flight requests once
    /// `shutdown_signal` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or run.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ApiError> {
        let listener = self.bind().await?;
        let app = create_router(self.state);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ApiError::Internal(format!("Server error: {e}")))?;

        warn!("API server shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::fixture;

    #[test]
    fn test_api_server_new() {
        let f = fixture();
        let server = ApiServer::new(f.state.clone());
        assert!(Arc::ptr_eq(server.state(), &f.state));
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let mut f = fixture();
        Arc::get_mut(&mut f.state).unwrap().config.host = "not an address".to_string();
        let err = ApiServer::new(f.state).run().await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(msg) if msg.contains("Invalid bind address")));
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_server() {
        let mut f = fixture();
        let config = &mut Arc::get_mut(&mut f.state).unwrap().config;
        config.host = "127.0.0.1".to_string();
        config.port = 0;
        ApiServer::new(f.state)
            .run_with_shutdown(async {})
            .await
            .unwrap();
    }
}
