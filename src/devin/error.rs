//! Session API error types.

use thiserror::Error;

use crate::retry::Retriable;

/// Errors talking to the session API.
#[derive(Debug, Error)]
pub enum DevinApiError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("session API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("session API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("session API response was malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Retriable for DevinApiError {
    fn is_transient(&self) -> bool {
        match self {
            DevinApiError::Request(_) => true,
            DevinApiError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            DevinApiError::Malformed(_) => false,
        }
    }
}
