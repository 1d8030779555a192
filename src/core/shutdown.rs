use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Graceful shutdown coordinator.
///
/// Shutdown sequence:
/// 1. Cancel the token (broadcast to all tasks)
/// 2. HTTP server stops accepting and drains in-flight requests for up to
///    `HTTP_DRAIN_TIMEOUT_SECS`; after that the server task is aborted and
///    connections still open are dropped with the runtime on exit
/// 3. View counter drains queued increments
/// Total shutdown timeout: 30 seconds, then exit with code 1.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Returns a clone of the cancellation token for use by tasks.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn trigger_shutdown(&self) {
        info!("shutdown signal received, broadcasting to all tasks");
        self.token.cancel();
    }

    /// Wait for SIGTERM or SIGINT and trigger coordinated shutdown.
    pub async fn wait_for_signal_and_shutdown(&self) {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C)"),
                        _ = sigterm.recv() => info!("received SIGTERM"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, waiting for SIGINT only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C)");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received SIGINT (Ctrl+C)");
        }

        self.trigger_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Total shutdown timeout in seconds.
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Time allowed for in-flight HTTP responses after cancellation.
///
/// A client that stops reading a long stream would otherwise hold the
/// graceful drain open indefinitely.
pub const HTTP_DRAIN_TIMEOUT_SECS: u64 = 10;

/// Time allowed for the view counter to drain after cancellation.
pub const VIEW_DRAIN_TIMEOUT_SECS: u64 = 5;

/// Wait for an already-cancelled HTTP server task to finish draining.
///
/// Aborts the task once `timeout` elapses. Returns `true` if the server
/// drained on its own.
pub async fn drain_http_server(server: JoinHandle<()>, timeout: Duration) -> bool {
    let abort = server.abort_handle();
    match tokio::time::timeout(timeout, server).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "HTTP server task failed");
            true
        }
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "HTTP drain timed out, abandoning open connections"
            );
            abort.abort();
            false
        }
    }
}
