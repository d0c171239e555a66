//! Serve command: runs the HTTP API in the foreground.
//!
//! Startup order:
//! - Shutdown coordinator (SIGTERM/SIGINT)
//! - Messaging session (pairing when no identity is stored)
//! - HTTP listener
//!
//! Any failure before the listener is up ends the process with an error.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use groupgate_server::{AppState, HttpServer, ShutdownCoordinator, router};
use groupgate_session::{
    CredentialStore, FileCredentialStore, MemoryClient, SessionError, SessionManager,
};

use crate::config::GroupgateConfig;
use crate::error::{CliError, CliResult};

/// Runs the service until a shutdown signal is received.
pub async fn run(config: &GroupgateConfig) -> CliResult<()> {
    let server_config = config.server_config().map_err(CliError::Config)?;

    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(&config.session.store_path));
    let approve_after = Duration::from_secs(config.session.loopback_approve_after_secs);
    let client = Arc::new(
        MemoryClient::new(store.clone())
            .with_group(server_config.group.clone(), "groupgate", std::iter::empty())
            .with_auto_approve(approve_after),
    );
    warn!(
        store = %config.session.store_path.display(),
        "Using the loopback messaging backend; group state is kept in memory"
    );

    let session = Arc::new(SessionManager::new(client, store));
    let shutdown = ShutdownCoordinator::new();
    shutdown.spawn_listener()?;

    match session.connect(&shutdown.token()).await {
        Ok(()) => info!(group = %server_config.group, "Session established"),
        Err(SessionError::Cancelled) => {
            info!("Shutdown requested before the session was established");
            session.disconnect();
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, "Failed to establish session");
            return Err(e.into());
        }
    }

    let server = match HttpServer::bind(&server_config).await {
        Ok(server) => server,
        Err(e) => {
            session.disconnect();
            return Err(e.into());
        }
    };
    let app = router(AppState::new(session.clone(), server_config.group.clone()));
    let serving = tokio::spawn(server.serve(app, shutdown.token().cancelled_owned()));

    shutdown
        .supervise(&session, serving, server_config.drain_timeout)
        .await?;

    info!("Server stopped");
    Ok(())
}
