//! Graceful shutdown coordination.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::{error, info};

/// Shutdown controller shared by the signal handler and the server loop.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    initiated: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Creates a new shutdown controller.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            initiated: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Initiates shutdown. Later calls are no-ops.
    pub fn initiate_shutdown(&self) {
        if self
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            let _ = self.shutdown_tx.send(());
        }
    }

    /// Returns whether shutdown has been initiated.
    #[must_use]
    pub fn is_shutdown_initiated(&self) -> bool {
        self.initiated.load(Ordering::SeqCst)
    }

    /// Completes once shutdown is initiated, including when that happened
    /// before the call.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_tx.subscribe();
        if self.is_shutdown_initiated() {
            return;
        }
        let _ = rx.recv().await;
    }
}

/// Waits for SIGINT or SIGTERM and initiates shutdown.
///
/// If the handlers cannot be installed the error is logged and the process
/// keeps running until stopped another way.
pub async fn setup_signal_handlers(controller: ShutdownController) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = %e, "Failed to install signal handlers");
                    return;
                }
            };

        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
        controller.initiate_shutdown();
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }
        info!("Received Ctrl+C");
        controller.initiate_shutdown();
    }
}
