//! HTTP control plane for one messaging group.
//!
//! This crate exposes the group administration API:
//! - `/health` reports whether the messaging session is connected
//! - `/group/*` routes list, add and remove members and share contacts
//! - A shared layer turns handler panics into 500 responses
//! - [`ShutdownCoordinator`] stops the listener, drains requests and closes
//!   the session on SIGTERM/SIGINT
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use groupgate_core::Jid;
//! use groupgate_server::{AppState, HttpServer, ServerConfig, ShutdownCoordinator, router};
//! use groupgate_session::{MemoryClient, MemoryCredentialStore, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new(Jid::group("1234567890-123456789"));
//!     let store = Arc::new(MemoryCredentialStore::new());
//!     let client = Arc::new(MemoryClient::new(store.clone()));
//!     let session = Arc::new(SessionManager::new(client, store));
//!
//!     let shutdown = ShutdownCoordinator::new();
//!     shutdown.spawn_listener()?;
//!     session.connect(&shutdown.token()).await?;
//!
//!     let server = HttpServer::bind(&config).await?;
//!     let app = router(AppState::new(session.clone(), config.group.clone()));
//!     let serving = tokio::spawn(server.serve(app, shutdown.token().cancelled_owned()));
//!     shutdown.supervise(&session, serving, config.drain_timeout).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod http;
mod signals;

pub use config::{DEFAULT_PORT, ServerConfig, default_listen_addr};
pub use error::{ApiError, ServerError, ServerResult};
pub use handler::{AppState, router};
pub use http::HttpServer;
pub use signals::ShutdownCoordinator;
