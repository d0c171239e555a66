//! Service configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/groupgate/config.toml` by default. Every section is optional;
//! only the administered group has no usable default.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! drain_timeout_secs = 10
//!
//! [session]
//! store_path = "./store.json"
//! group = "1234567890-123456789@g.us"
//!
//! [logging]
//! format = "compact"
//! level = "info"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

use groupgate_core::{Jid, LogFormat, LoggingConfig};
use groupgate_server::{ServerConfig, default_listen_addr};

/// Configuration for the groupgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupgateConfig {
    /// HTTP listener settings.
    pub server: ServerSettings,

    /// Messaging session settings.
    pub session: SessionSettings,

    /// Logging settings.
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind.
    pub listen: SocketAddr,

    /// Seconds in-flight requests may run after shutdown starts.
    pub drain_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            drain_timeout_secs: 10,
        }
    }
}

/// Messaging session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Credential store file.
    pub store_path: PathBuf,

    /// Administered group, `<id>@g.us` or bare `<id>`.
    pub group: Option<String>,

    /// Seconds before the loopback backend approves a pairing code.
    pub loopback_approve_after_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./store.json"),
            group: None,
            loopback_approve_after_secs: 5,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,

    /// Default level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            level: "info".to_string(),
        }
    }
}

impl GroupgateConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("groupgate")
            .join("config.toml")
    }

    /// Parses the configured group.
    pub fn group(&self) -> Result<Jid, String> {
        let raw = self
            .session
            .group
            .as_deref()
            .ok_or("no group configured; set [session] group or pass --group")?;
        Jid::parse_group(raw).map_err(|e| format!("invalid group '{}': {}", raw, e))
    }

    /// Builds the HTTP server configuration.
    pub fn server_config(&self) -> Result<ServerConfig, String> {
        let config = ServerConfig::new(self.group()?)
            .with_listen(self.server.listen)
            .with_drain_timeout(Duration::from_secs(self.server.drain_timeout_secs));
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    /// Builds the logging configuration.
    pub fn logging_config(&self) -> Result<LoggingConfig, String> {
        let level: Level = self
            .logging
            .level
            .parse()
            .map_err(|_| format!("invalid log level '{}'", self.logging.level))?;
        let base = if level == Level::DEBUG || level == Level::TRACE {
            LoggingConfig::debug()
        } else {
            LoggingConfig::service()
        };
        Ok(base.with_level(level).with_format(self.logging.format))
    }

    /// Checks every section without starting anything.
    pub fn validate(&self) -> Result<(), String> {
        self.server_config()?;
        self.logging_config()?;
        Ok(())
    }
}
