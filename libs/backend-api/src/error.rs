//! Error type for remote service calls

use thiserror::Error;

/// Result type alias for remote service calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure modes of a single remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response (connect, IO, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service rejected call ({code}): {message}")]
    Status { code: u16, message: String },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),

    /// No credential installed, or the service refused it.
    #[error("caller is not authenticated")]
    Unauthenticated,
}

impl ApiError {
    /// Check whether retrying the same call can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { code, .. } => matches!(code, 429 | 502 | 503 | 504),
            ApiError::Decode(_) | ApiError::Unauthenticated => false,
        }
    }
}
