//! Error types for the identity client.

use thiserror::Error;

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed (including timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the code exchange.
    #[error("code exchange rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The provider returned a user id this service cannot store.
    #[error("invalid user id: {0}")]
    InvalidUser(String),

    /// Response or configured URL could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The API key cannot be sent as a header.
    #[error("invalid API key format")]
    InvalidKey,
}

impl IdentityError {
    /// Stable code used in `/login?error=...` redirects.
    #[must_use]
    pub const fn redirect_code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } | Self::InvalidUser(_) => "auth_failed",
            Self::Http(_) | Self::Parse(_) | Self::InvalidKey => "provider_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_codes() {
        let rejected = IdentityError::Rejected {
            status: 400,
            message: "bad code".to_string(),
        };
        assert_eq!(rejected.redirect_code(), "auth_failed");
        assert_eq!(
            IdentityError::Parse("x".to_string()).redirect_code(),
            "provider_unavailable"
        );
    }
}
