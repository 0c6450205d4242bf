//! Error types for the Stripe client.

use thiserror::Error;

/// Errors from outbound Stripe API calls.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe rejected the request.
    #[error("Stripe API error ({error_type}): {message}")]
    Api { error_type: String, message: String },

    /// Response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The secret key cannot be sent as a header.
    #[error("invalid secret key format")]
    InvalidKey,
}

/// Error envelope returned by the Stripe API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, serde::Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
}
