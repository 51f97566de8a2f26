//! Item store error types.

use sitebook_shared::AppError;
use thiserror::Error;

/// Item store errors.
///
/// Cloneable so background write failures can be reported to the
/// presentation layer and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The item or location does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store answered with a non-success status.
    #[error("store returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The request could not be sent or timed out.
    #[error("request failed: {0}")]
    Http(String),

    /// The response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The store refused the write.
    #[error("write rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            _ => Self::Persistence(err.to_string()),
        }
    }
}
