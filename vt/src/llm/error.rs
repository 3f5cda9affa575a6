//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during extraction service calls
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Check if this is a client-side timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            LlmError::Network(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Parse a `retry-after` header value in seconds, defaulting to 60
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Duration {
    let secs = headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}
