//! groupgate CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use groupgate_cli::cli::{Cli, Command, ConfigAction};
use groupgate_cli::commands;
use groupgate_cli::config::GroupgateConfig;
use groupgate_cli::error::{CliError, CliResult};
use groupgate_core::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut config = if let Some(ref path) = cli.config {
        GroupgateConfig::load_from(path).map_err(CliError::Config)?
    } else {
        GroupgateConfig::load().map_err(CliError::Config)?
    };
    cli.apply_overrides(&mut config);

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        Some(Command::Serve) | None => {
            init_logging(config.logging_config().map_err(CliError::Config)?)?;
            commands::serve::run(&config).await
        }
    }
}
