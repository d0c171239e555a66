//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use groupgate_core::LogFormat;

use crate::config::GroupgateConfig;

/// groupgate - HTTP control plane for a messaging group
#[derive(Debug, Parser)]
#[command(name = "groupgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "GROUPGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Address the HTTP API listens on
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Path to the credential store
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Administered group (`<id>@g.us` or bare `<id>`)
    #[arg(long)]
    pub group: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_overrides(&self, config: &mut GroupgateConfig) {
        if let Some(listen) = self.listen {
            config.server.listen = listen;
        }
        if let Some(ref store) = self.store {
            config.session.store_path = store.clone();
        }
        if let Some(ref group) = self.group {
            config.session.group = Some(group.clone());
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        if self.debug {
            config.logging.level = "debug".to_string();
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API in the foreground (default)
    Serve,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["groupgate"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn overrides_replace_file_values() {
        let cli = Cli::try_parse_from([
            "groupgate",
            "--listen",
            "127.0.0.1:9090",
            "--store",
            "/tmp/creds.json",
            "--group",
            "42-99",
            "--log-format",
            "json",
            "--debug",
        ])
        .unwrap();
        let mut config = GroupgateConfig::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.server.listen, "127.0.0.1:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(config.session.store_path, PathBuf::from("/tmp/creds.json"));
        assert_eq!(config.session.group.as_deref(), Some("42-99"));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["groupgate", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn config_subcommand() {
        let cli = Cli::try_parse_from(["groupgate", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Validate
            })
        ));
    }
}
