//! TCP listener for the HTTP API.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// A bound HTTP listener, not yet serving.
///
/// Binding happens up front so an unusable address is reported before the
/// process claims to be ready.
pub struct HttpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl HttpServer {
    /// Binds the listen address from the configuration.
    pub async fn bind(config: &ServerConfig) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.listen)
            .await
            .map_err(|e| ServerError::bind(config.listen, e))?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "HTTP server listening");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the bound address. Useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves `app` until `shutdown` resolves, then stops accepting and
    /// waits for in-flight requests to finish.
    pub async fn serve<F>(self, app: Router, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        info!(addr = %self.local_addr, "HTTP server stopped");
        Ok(())
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::routing::get;
    use groupgate_core::Jid;
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn loopback_config() -> ServerConfig {
        ServerConfig::new(Jid::group("g")).with_listen("127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let server = HttpServer::bind(&loopback_config()).await.unwrap();
        assert!(server.local_addr().ip().is_loopback());
        assert_ne!(server.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn address_in_use_is_a_bind_error() {
        let first = HttpServer::bind(&loopback_config()).await.unwrap();
        let taken = loopback_config().with_listen(first.local_addr());

        let err = HttpServer::bind(&taken).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[tokio::test]
    async fn stops_when_shutdown_resolves() {
        let server = HttpServer::bind(&loopback_config()).await.unwrap();
        let token = CancellationToken::new();
        let app = Router::new().route("/", get(|| async { "ok" }));
        let task = tokio::spawn(server.serve(app, token.clone().cancelled_owned()));

        token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), task).await;
        assert!(result.unwrap().unwrap().is_ok());
    }
}
