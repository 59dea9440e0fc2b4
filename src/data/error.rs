//! Errors raised while talking to the upstream API

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when fetching from MangaDex
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The attempt did not finish within its timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Upstream answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected shape
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::Malformed(_))
    }

    /// Builds a status error, keeping only the start of the body
    pub fn status(status: u16, body: &str) -> Self {
        ApiError::Status {
            status,
            body: body.chars().take(100).collect(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Malformed(err.to_string())
    }
}
