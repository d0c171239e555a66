//! Error types for the session layer.
//!
//! - [`ClientError`] is what a messaging backend reports for a failed call.
//! - [`StoreError`] covers the credential store.
//! - [`SessionError`] is returned by [`SessionManager::connect`] and is
//!   always fatal at startup.
//!
//! [`SessionManager::connect`]: crate::SessionManager::connect

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The category of a messaging backend error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientErrorCode {
    /// The client has no live connection.
    NotConnected,
    /// A pairing was requested but a device identity already exists.
    AlreadyPaired,
    /// Network error: connection refused, reset, DNS, etc.
    NetworkError,
    /// The remote side answered with something the client did not expect.
    ProtocolError,
    /// The group or participant does not exist.
    NotFound,
    /// The paired account lacks permission (e.g. not a group admin).
    Forbidden,
    /// Too many requests.
    RateLimited,
    /// The remote side did not answer in time.
    Timeout,
    /// Unexpected state inside the client.
    InternalError,
}

impl ClientErrorCode {
    /// Returns true if the failure is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::Timeout
        )
    }

    /// Returns a stable snake_case name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::AlreadyPaired => "already_paired",
            Self::NetworkError => "network_error",
            Self::ProtocolError => "protocol_error",
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ClientErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error reported by a [`MessagingClient`](crate::MessagingClient).
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ClientError {
    code: ClientErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ClientError {
    /// Creates a new client error with the given code and message.
    pub fn new(code: ClientErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a not-connected error.
    pub fn not_connected(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::NotConnected, message)
    }

    /// Creates an already-paired error.
    pub fn already_paired(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::AlreadyPaired, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::NetworkError, message)
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::NotFound, message)
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::Forbidden, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ClientErrorCode::InternalError, message)
    }

    /// Sets the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ClientErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error is transient.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

/// A specialized Result type for messaging backend calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised by a [`CredentialStore`](crate::CredentialStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be read or written.
    #[error("credential store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store exists but does not hold a valid identity record.
    #[error("credential store at {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The store is not reachable for another reason.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// A specialized Result type for credential store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures while establishing the session.
///
/// Every variant is fatal at startup: without a session there is nothing to
/// serve.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The credential store could not be read.
    #[error("failed to load device identity: {0}")]
    Store(#[from] StoreError),

    /// The initial connect failed.
    #[error("failed to connect client: {0}")]
    Connect(#[source] ClientError),

    /// The backend refused to start a pairing attempt.
    #[error("failed to start pairing: {0}")]
    PairingUnavailable(#[source] ClientError),

    /// No code was scanned before the backend gave up.
    #[error("pairing timed out before a code was scanned")]
    PairingTimeout,

    /// The backend reported a pairing failure.
    #[error("pairing failed: {message}")]
    PairingFailed { message: String },

    /// The pairing consumer task did not finish normally.
    #[error("pairing task aborted: {message}")]
    PairingTask { message: String },

    /// The cancellation scope fired while connecting.
    #[error("session startup cancelled")]
    Cancelled,
}

/// A specialized Result type for session lifecycle operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(ClientErrorCode::NetworkError.is_retryable());
        assert!(ClientErrorCode::Timeout.is_retryable());
        assert!(!ClientErrorCode::NotFound.is_retryable());
        assert!(!ClientErrorCode::AlreadyPaired.is_retryable());
    }

    #[test]
    fn client_error_display_includes_code_and_message() {
        let err = ClientError::not_found("group 123@g.us not found");
        assert_eq!(err.code(), ClientErrorCode::NotFound);
        assert_eq!(err.message(), "group 123@g.us not found");
        assert_eq!(err.to_string(), "not_found: group 123@g.us not found");
    }

    #[test]
    fn client_error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("socket closed");
        let err = ClientError::network("send failed").with_source(io_err);
        assert!(err.source().is_some());
        assert!(err.is_retryable());
    }

    #[test]
    fn session_error_wraps_store_error() {
        let err: SessionError = StoreError::Unavailable("locked".into()).into();
        assert!(matches!(err, SessionError::Store(_)));
        assert!(err.to_string().contains("locked"));
    }
}
