//! Error types for the Claude API client.

use thiserror::Error;

/// Errors that can occur when interacting with the Claude API.
#[derive(Debug, Error)]
pub enum ClaudeError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Claude API returned an error.
    #[error("API error ({error_type}): {message}")]
    Api {
        /// Error type from the API.
        error_type: String,
        /// Error message.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// The response contained no usable text.
    #[error("empty response")]
    EmptyResponse,

    /// The API key cannot be sent as a header.
    #[error("invalid API key format")]
    InvalidApiKey,
}

impl ClaudeError {
    /// Short, user-safe summary of the failure.
    #[must_use]
    pub fn summary(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "The writing assistant is busy, please retry shortly",
            Self::EmptyResponse | Self::Parse(_) => "The writing assistant returned no usable text",
            Self::Http(e) if e.is_timeout() => "The writing assistant timed out",
            _ => "The writing assistant is unavailable",
        }
    }
}

/// API error response from Claude.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Nested error details.
    pub error: ApiError,
}

/// Nested error details.
#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    pub message: String,
}
