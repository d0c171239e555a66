//! Server error types.

use std::io;
use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, warn};

use groupgate_session::ClientError;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error while serving.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The listen address could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Signal handlers could not be installed.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] io::Error),

    /// The serving task panicked or was aborted.
    #[error("Server task failed: {message}")]
    Task { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a bind error.
    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }
}

/// Request-level failure, rendered as a plain-text HTTP response.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required query parameter is missing or empty. Maps to 400.
    #[error("{0}")]
    Validation(&'static str),

    /// The messaging backend rejected the call. Maps to 500 with the
    /// backend's error text in the body.
    #[error("{context}: {source}")]
    Provider {
        context: &'static str,
        #[source]
        source: ClientError,
    },
}

impl ApiError {
    /// Creates a provider error with a short description of what failed.
    pub fn provider(context: &'static str, source: ClientError) -> Self {
        Self::Provider { context, source }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Provider { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Validation(message) => debug!(%message, "Rejected request"),
            Self::Provider { context, source } => {
                warn!(%context, code = %source.code(), error = %source, "Provider call failed")
            }
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_bad_request() {
        let err = ApiError::Validation("Missing phone parameter");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Missing phone parameter");
    }

    #[test]
    fn provider_error_embeds_backend_text() {
        let err = ApiError::provider(
            "Failed to add member",
            ClientError::forbidden("not a group admin"),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Failed to add member: forbidden: not a group admin"
        );
    }

    #[test]
    fn bind_error_names_address() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let err = ServerError::bind(addr, io::Error::from(io::ErrorKind::AddrInUse));
        assert!(err.to_string().contains("127.0.0.1:8080"));
    }
}
