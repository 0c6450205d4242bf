//! Anthropic Messages API integration for description generation.
//!
//! The generation service talks to the model through [`TextGenerator`], so
//! tests can substitute a scripted implementation.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::ClaudeClient;
pub use error::ClaudeError;

/// A stateless request/response text completion provider.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt` under the given system instructions.
    ///
    /// Returns the full response text. Empty output is an error.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ClaudeError>;
}
