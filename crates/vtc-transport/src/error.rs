//! Transport error types.

use thiserror::Error;
use vtc_models::VideoId;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Rejected locally, before any network round-trip.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The service refused the submission.
    #[error("submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unknown video id: {0}")]
    NotFound(VideoId),

    /// Non-success status response; the service may recover.
    #[error("status endpoint returned {status}")]
    Unavailable { status: u16 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Whether a poll loop should treat this as a transient fault.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_)
                | TransportError::Unavailable { .. }
                | TransportError::InvalidResponse(_)
        )
    }
}
