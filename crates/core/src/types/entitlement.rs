//! Generation entitlement rule.

use super::status::SubscriptionStatus;

/// Credits granted to a profile when it is first created.
pub const STARTING_CREDITS: i32 = 3;

/// What a profile is allowed to do before a generation is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    /// Active subscription; no credit is consumed.
    Unlimited,
    /// Not subscribed but has credits left; one is consumed on success.
    Credit {
        /// Credits held before this generation.
        remaining: i32,
    },
    /// Neither subscribed nor holding credits.
    Denied,
}

impl Entitlement {
    /// Decide entitlement from a profile's status and credit balance.
    #[must_use]
    pub const fn evaluate(status: SubscriptionStatus, credits_remaining: i32) -> Self {
        if status.is_active() {
            Self::Unlimited
        } else if credits_remaining > 0 {
            Self::Credit {
                remaining: credits_remaining,
            }
        } else {
            Self::Denied
        }
    }

    /// Whether a generation may proceed.
    #[must_use]
    pub const fn allows_generation(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_is_unlimited_even_without_credits() {
        assert_eq!(
            Entitlement::evaluate(SubscriptionStatus::Active, 0),
            Entitlement::Unlimited
        );
    }

    #[test]
    fn test_credits_entitle_unsubscribed() {
        assert_eq!(
            Entitlement::evaluate(SubscriptionStatus::None, STARTING_CREDITS),
            Entitlement::Credit { remaining: 3 }
        );
        assert!(Entitlement::evaluate(SubscriptionStatus::Canceled, 1).allows_generation());
    }

    #[test]
    fn test_no_credits_no_subscription_denied() {
        for status in [SubscriptionStatus::None, SubscriptionStatus::Canceled] {
            let entitlement = Entitlement::evaluate(status, 0);
            assert_eq!(entitlement, Entitlement::Denied);
            assert!(!entitlement.allows_generation());
        }
    }
}
