//! Generation error types.

use thiserror::Error;

use propscribe_core::PropertyDetailsError;

use crate::anthropic::ClaudeError;
use crate::db::RepositoryError;

/// User-facing prompt returned when a generation is not allowed.
pub const UPGRADE_PROMPT: &str =
    "You have used all your free credits. Subscribe for unlimited descriptions.";

/// Errors that stop a generation from producing a description.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Submitted property details failed validation.
    #[error("invalid property details: {0}")]
    InvalidInput(#[from] PropertyDetailsError),

    /// The caller has no profile.
    #[error("profile not found")]
    ProfileNotFound,

    /// Not subscribed and no credits left.
    #[error("{UPGRADE_PROMPT}")]
    InsufficientEntitlement,

    /// No text generation provider is configured.
    #[error("text generation is not configured")]
    NotConfigured,

    /// The text generation provider failed or returned unusable output.
    #[error("generation provider failure: {0}")]
    Provider(#[from] ClaudeError),

    /// Reading the profile failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
