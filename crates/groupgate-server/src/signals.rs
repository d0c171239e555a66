//! Shutdown coordination.
//!
//! One [`ShutdownCoordinator`] owns the process-wide cancellation token.
//! SIGTERM and SIGINT (Ctrl+C elsewhere) cancel it, after which the HTTP
//! server stops accepting, in-flight requests drain for a bounded time and
//! the messaging session is closed.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use groupgate_session::SessionManager;

use crate::error::{ServerError, ServerResult};

/// Owns the shutdown token and the ordered stop sequence.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Creates a coordinator with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs signal handlers and spawns the listener task.
    ///
    /// Handlers are installed before this returns so a failure is reported
    /// to the caller instead of leaving the process deaf to signals.
    #[cfg(unix)]
    pub fn spawn_listener(&self) -> ServerResult<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).map_err(ServerError::Signal)?;
        let mut sigint = signal(SignalKind::interrupt()).map_err(ServerError::Signal)?;
        let token = self.token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
                _ = sigint.recv() => info!("Received SIGINT, initiating shutdown"),
                _ = token.cancelled() => {
                    debug!("Signal listener stopped");
                    return;
                }
            }
            token.cancel();
        });
        Ok(())
    }

    /// Non-Unix implementation, Ctrl+C only.
    #[cfg(not(unix))]
    pub fn spawn_listener(&self) -> ServerResult<()> {
        let token = self.token.clone();

        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => info!("Received Ctrl+C, initiating shutdown"),
                    Err(e) => {
                        error!(error = %e, "Ctrl+C handler failed");
                        return;
                    }
                },
                _ = token.cancelled() => return,
            }
            token.cancel();
        });
        Ok(())
    }

    /// Returns a clone of the shutdown token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Programmatically triggers a shutdown.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns true if shutdown has been triggered.
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits until shutdown is triggered.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// Supervises a running server until shutdown, then stops everything in
    /// order: the server drains for at most `drain_timeout`, then the session
    /// is disconnected.
    ///
    /// If the server exits on its own before a signal arrives, shutdown is
    /// triggered and the server's error is returned.
    pub async fn supervise(
        &self,
        session: &SessionManager,
        mut server: JoinHandle<ServerResult<()>>,
        drain_timeout: Duration,
    ) -> ServerResult<()> {
        let result = tokio::select! {
            _ = self.token.cancelled() => {
                info!("Shutting down...");
                match tokio::time::timeout(drain_timeout, &mut server).await {
                    Ok(joined) => flatten(joined),
                    Err(_) => {
                        warn!(
                            timeout_secs = drain_timeout.as_secs(),
                            "Drain timeout elapsed, abandoning in-flight requests"
                        );
                        server.abort();
                        Ok(())
                    }
                }
            }
            joined = &mut server => {
                let result = flatten(joined);
                if let Err(e) = &result {
                    error!(error = %e, "HTTP server stopped unexpectedly");
                }
                self.token.cancel();
                result
            }
        };

        session.disconnect();
        info!("Session disconnected");
        result
    }
}

fn flatten(joined: Result<ServerResult<()>, tokio::task::JoinError>) -> ServerResult<()> {
    joined.map_err(|e| ServerError::Task {
        message: e.to_string(),
    })?
}
