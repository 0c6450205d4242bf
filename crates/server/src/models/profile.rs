//! User profile domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use propscribe_core::{BillingState, SubscriptionStatus, UserId};

/// Per-user credit balance and subscription state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    /// Captured at first sign-in, used as the billing customer email.
    pub email: Option<String>,
    /// Never negative.
    pub credits_remaining: i32,
    pub subscription_status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Billing-relevant slice used by reconciliation.
    #[must_use]
    pub fn billing_state(&self) -> BillingState {
        BillingState {
            subscription_status: self.subscription_status,
            stripe_customer_id: self.stripe_customer_id.clone(),
        }
    }
}

/// What `GET /profile` returns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub email: Option<String>,
    pub credits_remaining: i32,
    pub subscription_status: SubscriptionStatus,
    pub has_billing_customer: bool,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            email: profile.email.clone(),
            credits_remaining: profile.credits_remaining,
            subscription_status: profile.subscription_status,
            has_billing_customer: profile.stripe_customer_id.is_some(),
        }
    }
}

/// Result of the conditional credit debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// One credit was consumed.
    Debited { remaining: i32 },
    /// Active subscription; nothing was consumed.
    Unlimited,
    /// No credit left to consume (another request took the last one).
    Exhausted,
}
