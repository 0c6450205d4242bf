//! Billing lifecycle events and their reconciliation onto a profile.
//!
//! Payment providers deliver events at least once and possibly out of order.
//! Every transition here sets absolute values, so applying the same event
//! twice leaves the profile exactly as applying it once.

use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::status::SubscriptionStatus;

/// Billing-relevant slice of a profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillingState {
    pub subscription_status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
}

/// A verified lifecycle event, reduced to what reconciliation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    /// Hosted checkout finished; the user now has a paid subscription.
    CheckoutCompleted {
        user_id: UserId,
        customer_id: String,
    },
    /// Subscription changed state at the provider.
    SubscriptionUpdated {
        customer_id: String,
        /// Raw provider status, e.g. `active` or `past_due`.
        provider_status: String,
    },
    /// Subscription ended.
    SubscriptionDeleted { customer_id: String },
    /// Any event type the service does not act on.
    Ignored { event_type: String },
}

/// How to find the profile an event applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingTarget<'a> {
    User(&'a UserId),
    Customer(&'a str),
}

impl BillingEvent {
    /// Profile lookup key for this event, or `None` if it needs no profile.
    #[must_use]
    pub fn target(&self) -> Option<BillingTarget<'_>> {
        match self {
            Self::CheckoutCompleted { user_id, .. } => Some(BillingTarget::User(user_id)),
            Self::SubscriptionUpdated { customer_id, .. }
            | Self::SubscriptionDeleted { customer_id } => {
                Some(BillingTarget::Customer(customer_id))
            }
            Self::Ignored { .. } => None,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::CheckoutCompleted { .. } => "checkout_completed",
            Self::SubscriptionUpdated { .. } => "subscription_updated",
            Self::SubscriptionDeleted { .. } => "subscription_deleted",
            Self::Ignored { event_type } => event_type,
        }
    }
}

/// Result of applying an event to a billing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingTransition {
    pub from: BillingState,
    pub to: BillingState,
}

impl BillingTransition {
    /// Whether the event changed anything.
    #[must_use]
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }
}

/// Apply an event to the current billing state.
#[must_use]
pub fn reconcile(current: &BillingState, event: &BillingEvent) -> BillingTransition {
    let to = match event {
        BillingEvent::CheckoutCompleted { customer_id, .. } => BillingState {
            subscription_status: SubscriptionStatus::Active,
            stripe_customer_id: Some(customer_id.clone()),
        },
        BillingEvent::SubscriptionUpdated {
            provider_status, ..
        } => BillingState {
            subscription_status: SubscriptionStatus::from_provider_status(provider_status),
            ..current.clone()
        },
        BillingEvent::SubscriptionDeleted { .. } => BillingState {
            subscription_status: SubscriptionStatus::Canceled,
            ..current.clone()
        },
        BillingEvent::Ignored { .. } => current.clone(),
    };

    BillingTransition {
        from: current.clone(),
        to,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn checkout() -> BillingEvent {
        BillingEvent::CheckoutCompleted {
            user_id: UserId::parse("u1").unwrap(),
            customer_id: "cus_1".to_owned(),
        }
    }

    #[test]
    fn test_checkout_activates_and_links_customer() {
        let t = reconcile(&BillingState::default(), &checkout());
        assert!(t.is_change());
        assert_eq!(t.to.subscription_status, SubscriptionStatus::Active);
        assert_eq!(t.to.stripe_customer_id.as_deref(), Some("cus_1"));
    }

    #[test]
    fn test_checkout_replay_is_idempotent() {
        let once = reconcile(&BillingState::default(), &checkout()).to;
        let twice = reconcile(&once, &checkout());
        assert_eq!(twice.to, once);
        assert!(!twice.is_change());
    }

    #[test]
    fn test_subscription_updated_maps_status() {
        let active = BillingState {
            subscription_status: SubscriptionStatus::Active,
            stripe_customer_id: Some("cus_1".to_owned()),
        };
        let event = BillingEvent::SubscriptionUpdated {
            customer_id: "cus_1".to_owned(),
            provider_status: "past_due".to_owned(),
        };
        let t = reconcile(&active, &event);
        assert_eq!(t.to.subscription_status, SubscriptionStatus::Canceled);
        assert_eq!(t.to.stripe_customer_id.as_deref(), Some("cus_1"));
    }

    #[test]
    fn test_subscription_deleted_cancels() {
        let active = BillingState {
            subscription_status: SubscriptionStatus::Active,
            stripe_customer_id: Some("cus_1".to_owned()),
        };
        let event = BillingEvent::SubscriptionDeleted {
            customer_id: "cus_1".to_owned(),
        };
        assert_eq!(
            reconcile(&active, &event).to.subscription_status,
            SubscriptionStatus::Canceled
        );
    }

    #[test]
    fn test_ignored_event_changes_nothing() {
        let event = BillingEvent::Ignored {
            event_type: "invoice.paid".to_owned(),
        };
        assert!(event.target().is_none());
        assert_eq!(event.kind(), "invoice.paid");
        assert!(!reconcile(&BillingState::default(), &event).is_change());
    }

    #[test]
    fn test_targets() {
        let user = UserId::parse("u1").unwrap();
        assert_eq!(checkout().target(), Some(BillingTarget::User(&user)));
        let deleted = BillingEvent::SubscriptionDeleted {
            customer_id: "cus_9".to_owned(),
        };
        assert_eq!(deleted.target(), Some(BillingTarget::Customer("cus_9")));
    }
}
