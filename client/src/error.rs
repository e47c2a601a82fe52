/// Error types for the murmur client tier
use thiserror::Error;

use backend_api::ApiError;
use query_cache::FetchError;

use crate::validation::ValidationError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Input rejected locally, before any remote call was attempted.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The remote service call itself failed.
    #[error("remote call failed: {0}")]
    Remote(#[from] ApiError),

    /// The operation requires a signed-in identity.
    #[error("not authenticated")]
    NotAuthenticated,
}

/// Only transport-level trouble is worth retrying. Validation failures and
/// missing authentication come back identical however often we ask.
impl FetchError for ClientError {
    fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Remote(e) if e.is_retryable())
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
