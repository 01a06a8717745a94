//! Backend error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when talking to the enrichment backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::RateLimited { .. } => true,
            BackendError::ApiError { status, .. } => *status == 408 || *status >= 500,
            BackendError::Network(_) => true,
            BackendError::Timeout(_) => true,
            BackendError::InvalidResponse(_) => false,
            BackendError::Json(_) => false,
        }
    }

    /// Get the retry duration if this is a rate limit error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BackendError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
