//! Error types for the external-collaborator clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the print backend or the
/// URL-shortening service
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Collaborator returned an error status code
    #[error("backend error (status {status}): {message}")]
    BackendRejected {
        /// HTTP status code
        status: u16,
        /// Response body, for operator-visible diagnostics
        message: String,
    },

    /// Failed to parse a collaborator response
    #[error("failed to parse response: {0}")]
    ParseError(String),
}

impl ClientError {
    /// Create a rejection error from status code and response body
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::BackendRejected {
            status,
            message: message.into(),
        }
    }

    /// Whether the failure happened before a response arrived
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::RequestFailed(_))
    }
}
