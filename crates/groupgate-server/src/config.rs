//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use groupgate_core::Jid;

use crate::error::{ServerError, ServerResult};

/// Port the service listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// Server configuration. Fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen: SocketAddr,

    /// The single administered group.
    pub group: Jid,

    /// How long in-flight requests may run after shutdown starts.
    pub drain_timeout: Duration,
}

impl ServerConfig {
    /// Creates a configuration for the given group with default settings.
    pub fn new(group: Jid) -> Self {
        Self {
            listen: default_listen_addr(),
            group,
            drain_timeout: Duration::from_secs(10),
        }
    }

    /// Builder: set the listen address.
    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    /// Builder: set the drain timeout.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Checks that the configuration can be served.
    pub fn validate(&self) -> ServerResult<()> {
        if !self.group.is_group() {
            return Err(ServerError::config(format!(
                "{} is not a group identifier",
                self.group
            )));
        }
        Ok(())
    }
}

/// Returns the default listen address (all interfaces, port 8080).
pub fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::new(Jid::group("1234567890-123456789"));
        assert_eq!(config.listen.port(), DEFAULT_PORT);
        assert!(config.listen.ip().is_unspecified());
        assert_eq!(config.drain_timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let listen: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::new(Jid::group("g"))
            .with_listen(listen)
            .with_drain_timeout(Duration::from_secs(2));

        assert_eq!(config.listen, listen);
        assert_eq!(config.drain_timeout, Duration::from_secs(2));
    }

    #[test]
    fn participant_is_not_a_valid_group() {
        let config = ServerConfig::new(Jid::participant("15551234567"));
        assert!(matches!(config.validate(), Err(ServerError::Config { .. })));
    }
}
