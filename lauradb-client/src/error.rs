//! Error types for client operations.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the client.
///
/// The two-layer split matters to callers: [`ClientError::Transport`] means
/// the service could not be reached or answered unusably, while
/// [`ClientError::Api`] means the service understood the request and rejected
/// it. The two demand different retry/backoff policies upstream; the client
/// itself never retries.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Connectivity failure, timeout, non-success HTTP status, or a
    /// malformed response body.
    #[error("transport error: {0}")]
    Transport(String),

    /// A well-formed response with `ok: false`.
    #[error("api error: {0}")]
    Api(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a transport-layer failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is an API-level rejection.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}
