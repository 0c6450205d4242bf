//! Profile administration.
//!
//! Goes through the same store the server uses, so credit and status rules
//! (non-negative balance, absolute billing writes) hold here too.

use propscribe_core::{BillingState, SubscriptionStatus, UserId, UserIdError};
use propscribe_server::db::{PgProfileStore, ProfileStore, RepositoryError};
use propscribe_server::models::Profile;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid user id: {0}")]
    InvalidUser(#[from] UserIdError),

    #[error("{0}")]
    InvalidStatus(String),

    #[error("Credits must be positive, got {0}")]
    InvalidCredits(i32),

    #[error("No profile for user {0}")]
    NotFound(UserId),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

async fn store() -> Result<PgProfileStore, ProfileError> {
    Ok(PgProfileStore::new(connect().await?))
}

fn log_profile(profile: &Profile) {
    tracing::info!(
        user_id = %profile.user_id,
        email = profile.email.as_deref().unwrap_or("-"),
        credits_remaining = profile.credits_remaining,
        subscription_status = %profile.subscription_status,
        stripe_customer_id = profile.stripe_customer_id.as_deref().unwrap_or("-"),
        "Profile"
    );
}

pub async fn show(user: &str) -> Result<(), ProfileError> {
    let user_id = UserId::parse(user)?;
    let profile = store()
        .await?
        .get(&user_id)
        .await?
        .ok_or(ProfileError::NotFound(user_id))?;
    log_profile(&profile);
    Ok(())
}

pub async fn grant_credits(user: &str, credits: i32) -> Result<(), ProfileError> {
    let user_id = UserId::parse(user)?;
    if credits <= 0 {
        return Err(ProfileError::InvalidCredits(credits));
    }

    let profile = store()
        .await?
        .grant_credits(&user_id, credits)
        .await?
        .ok_or(ProfileError::NotFound(user_id))?;

    tracing::info!(credits, "Credits granted");
    log_profile(&profile);
    Ok(())
}

/// Override the status, keeping the linked billing customer.
pub async fn set_status(user: &str, status: &str) -> Result<(), ProfileError> {
    let user_id = UserId::parse(user)?;
    let status: SubscriptionStatus = status.parse().map_err(ProfileError::InvalidStatus)?;

    let store = store().await?;
    let profile = store
        .get(&user_id)
        .await?
        .ok_or_else(|| ProfileError::NotFound(user_id.clone()))?;

    let state = BillingState {
        subscription_status: status,
        ..profile.billing_state()
    };
    store.apply_billing(&user_id, &state).await?;

    tracing::info!(
        user_id = %user_id,
        from = %profile.subscription_status,
        to = %status,
        "Subscription status overridden"
    );
    Ok(())
}
