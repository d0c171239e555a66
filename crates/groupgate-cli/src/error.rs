//! CLI error types.

use std::fmt;

use groupgate_core::LoggingError;
use groupgate_server::ServerError;
use groupgate_session::SessionError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end the process with a non-zero status.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Logging could not be initialized.
    Logging(LoggingError),
    /// The messaging session could not be established.
    Session(SessionError),
    /// The HTTP server failed.
    Server(ServerError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Logging(err) => write!(f, "logging error: {}", err),
            Self::Session(err) => write!(f, "session error: {}", err),
            Self::Server(err) => write!(f, "server error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(_) => None,
            Self::Logging(err) => Some(err),
            Self::Session(err) => Some(err),
            Self::Server(err) => Some(err),
        }
    }
}

impl From<LoggingError> for CliError {
    fn from(err: LoggingError) -> Self {
        Self::Logging(err)
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<ServerError> for CliError {
    fn from(err: ServerError) -> Self {
        Self::Server(err)
    }
}
