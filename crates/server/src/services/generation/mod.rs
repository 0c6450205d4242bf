//! Description generation: entitlement check, provider call, credit debit,
//! and history recording.
//!
//! Once the provider has produced text, later failures never take it away
//! from the caller, with one exception: if the conditional debit finds the
//! credits already gone (a concurrent request took the last one), the text
//! is withheld so the balance can never go negative.

mod error;
mod prompt;

pub use error::{GenerationError, UPGRADE_PROMPT};
pub use prompt::{SYSTEM_PROMPT, build_prompt};

use serde::Serialize;
use tracing::instrument;

use propscribe_core::{Entitlement, GenerationId, PropertyDetails, UserId};

use crate::anthropic::{ClaudeError, TextGenerator};
use crate::db::{GenerationStore, ProfileStore};
use crate::models::DebitOutcome;

/// Warning returned with a description when the credit debit failed.
pub const CREDIT_UPDATE_WARNING: &str =
    "Your description was generated, but we could not update your credit balance.";

/// A successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub description: String,
    /// Balance after the debit; absent for subscribers or when the debit failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credits_remaining: Option<i32>,
    /// Set when the description was delivered despite a credit update failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Id of the stored generation record; absent if recording failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_id: Option<GenerationId>,
}

/// Generation service.
pub struct GenerationService<'a> {
    profiles: &'a dyn ProfileStore,
    generations: &'a dyn GenerationStore,
    generator: Option<&'a dyn TextGenerator>,
}

impl<'a> GenerationService<'a> {
    /// Create a new generation service.
    #[must_use]
    pub const fn new(
        profiles: &'a dyn ProfileStore,
        generations: &'a dyn GenerationStore,
        generator: Option<&'a dyn TextGenerator>,
    ) -> Self {
        Self {
            profiles,
            generations,
            generator,
        }
    }

    /// Generate a description for the caller.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::InsufficientEntitlement` if the caller is not
    /// subscribed and has no credits (the provider is not called), and
    /// `GenerationError::Provider` if the provider fails or returns no text.
    #[instrument(skip(self, details), fields(user_id = %user_id))]
    pub async fn generate(
        &self,
        user_id: &UserId,
        details: PropertyDetails,
    ) -> Result<GenerationOutcome, GenerationError> {
        let details = details.normalized()?;

        let profile = self
            .profiles
            .get(user_id)
            .await?
            .ok_or(GenerationError::ProfileNotFound)?;

        let entitlement =
            Entitlement::evaluate(profile.subscription_status, profile.credits_remaining);
        if !entitlement.allows_generation() {
            tracing::info!("Generation denied, no credits and no subscription");
            return Err(GenerationError::InsufficientEntitlement);
        }

        let generator = self.generator.ok_or(GenerationError::NotConfigured)?;

        let description = generator
            .complete(SYSTEM_PROMPT, &build_prompt(&details))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Text generation failed"))?;
        if description.trim().is_empty() {
            return Err(GenerationError::Provider(ClaudeError::EmptyResponse));
        }

        let (credits_remaining, warning) = match self.profiles.debit_credit(user_id).await {
            Ok(DebitOutcome::Debited { remaining }) => (Some(remaining), None),
            Ok(DebitOutcome::Unlimited) => (None, None),
            Ok(DebitOutcome::Exhausted) => {
                tracing::warn!("Credits exhausted by a concurrent request, withholding text");
                return Err(GenerationError::InsufficientEntitlement);
            }
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    "Credit update failed after successful generation"
                );
                (None, Some(CREDIT_UPDATE_WARNING.to_string()))
            }
        };

        let generation_id = match self
            .generations
            .insert(user_id, &details, &description)
            .await
        {
            Ok(generation) => Some(generation.id),
            Err(e) => {
                tracing::error!(error = %e, "Failed to record generation");
                None
            }
        };

        tracing::info!(
            credits_remaining = ?credits_remaining,
            generation_id = ?generation_id,
            "Description generated"
        );

        Ok(GenerationOutcome {
            description,
            credits_remaining,
            warning,
            generation_id,
        })
    }
}
