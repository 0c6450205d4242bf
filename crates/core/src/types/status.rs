//! Subscription status of a user profile.

use serde::{Deserialize, Serialize};

/// Billing subscription status stored on a profile.
///
/// `Active` grants unlimited generations regardless of remaining credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Never subscribed.
    #[default]
    None,
    /// Paid subscription in good standing.
    Active,
    /// Subscription ended or lapsed.
    Canceled,
}

impl SubscriptionStatus {
    /// Map a payment provider subscription status onto the profile status.
    ///
    /// `active` and `trialing` keep generation unlimited; every other value
    /// (`past_due`, `unpaid`, `incomplete`, `paused`, unknown future values)
    /// falls back to `Canceled` so a lapsed payment never keeps access open.
    #[must_use]
    pub fn from_provider_status(status: &str) -> Self {
        match status {
            "active" | "trialing" => Self::Active,
            _ => Self::Canceled,
        }
    }

    /// Whether this status grants unlimited generation.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Active => write!(f, "active"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "active" => Ok(Self::Active),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("invalid subscription status: {s}")),
        }
    }
}
