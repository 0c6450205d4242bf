//! Billing reconciliation for payment-provider webhooks.
//!
//! A verified event is reduced to a [`BillingEvent`], the target profile is
//! looked up, and [`reconcile`] decides the new billing state. Only changed
//! states are written, and writes are absolute, so duplicate or replayed
//! deliveries are harmless.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use propscribe_core::{BillingEvent, BillingTarget, reconcile};

use crate::db::{ProfileStore, RepositoryError};
use crate::stripe::{WebhookError, parse_event, verify_signature};

/// Errors that reject a webhook delivery before any state is touched.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Signature header missing, malformed, stale, or not matching.
    #[error("invalid signature: {0}")]
    InvalidSignature(WebhookError),

    /// Signed body is not an event envelope.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// No webhook signing secret is configured.
    #[error("billing webhooks are not configured")]
    NotConfigured,
}

impl From<WebhookError> for BillingError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::MalformedPayload(msg) => Self::MalformedPayload(msg),
            other => Self::InvalidSignature(other),
        }
    }
}

/// What happened to an acknowledged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingOutcome {
    /// The profile's billing state changed.
    Applied,
    /// The profile already had the resulting state.
    Unchanged,
    /// The event type is not acted on.
    Ignored,
    /// No profile matches the event.
    ProfileLookupMiss,
    /// The store failed; logged and acknowledged.
    StoreFailed,
}

/// Billing reconciliation service.
pub struct BillingService<'a> {
    profiles: &'a dyn ProfileStore,
    webhook_secret: Option<&'a SecretString>,
}

impl<'a> BillingService<'a> {
    #[must_use]
    pub const fn new(profiles: &'a dyn ProfileStore, webhook_secret: Option<&'a SecretString>) -> Self {
        Self {
            profiles,
            webhook_secret,
        }
    }

    /// Verify and apply a raw webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify or the payload is
    /// malformed. Nothing is written in that case.
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<BillingOutcome, BillingError> {
        self.handle_webhook_at(payload, signature, chrono::Utc::now().timestamp())
            .await
    }

    /// [`Self::handle_webhook`] with an explicit current unix time.
    ///
    /// # Errors
    ///
    /// See [`Self::handle_webhook`].
    pub async fn handle_webhook_at(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        now: i64,
    ) -> Result<BillingOutcome, BillingError> {
        let secret = self.webhook_secret.ok_or(BillingError::NotConfigured)?;
        let header = signature.ok_or(WebhookError::MissingHeader)?;

        verify_signature(secret.expose_secret(), header, payload, now).inspect_err(|e| {
            tracing::warn!(error = %e, "Rejected webhook with invalid signature");
        })?;

        let parsed = parse_event(payload)?;
        tracing::info!(event_id = %parsed.id, kind = parsed.event.kind(), "Webhook received");

        Ok(self.apply(&parsed.event).await)
    }

    /// Apply a verified event to the matching profile.
    #[instrument(skip(self, event), fields(kind = event.kind()))]
    pub async fn apply(&self, event: &BillingEvent) -> BillingOutcome {
        let Some(target) = event.target() else {
            tracing::debug!("Ignoring unhandled event type");
            return BillingOutcome::Ignored;
        };

        match self.try_apply(event, target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    "Failed to apply billing event"
                );
                BillingOutcome::StoreFailed
            }
        }
    }

    async fn try_apply(
        &self,
        event: &BillingEvent,
        target: BillingTarget<'_>,
    ) -> Result<BillingOutcome, RepositoryError> {
        let profile = match target {
            BillingTarget::User(user_id) => self.profiles.get(user_id).await?,
            BillingTarget::Customer(customer_id) => {
                self.profiles.find_by_customer(customer_id).await?
            }
        };

        let Some(profile) = profile else {
            tracing::warn!(lookup = ?target, "No profile matches billing event");
            return Ok(BillingOutcome::ProfileLookupMiss);
        };

        let transition = reconcile(&profile.billing_state(), event);
        if !transition.is_change() {
            return Ok(BillingOutcome::Unchanged);
        }

        self.profiles
            .apply_billing(&profile.user_id, &transition.to)
            .await?;

        tracing::info!(
            user_id = %profile.user_id,
            from = %transition.from.subscription_status,
            to = %transition.to.subscription_status,
            "Billing state updated"
        );
        Ok(BillingOutcome::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use propscribe_core::{SubscriptionStatus, UserId};

    use super::*;
    use crate::db::memory::MemoryProfileStore;
    use crate::testing::{TEST_WEBHOOK_SECRET, sign_webhook};

    const NOW: i64 = 1_700_000_000;

    fn secret() -> SecretString {
        SecretString::from(TEST_WEBHOOK_SECRET.to_string())
    }

    fn checkout_payload(user: &str, customer: &str) -> String {
        serde_json::json!({
            "id": "evt_checkout",
            "type": "checkout.session.completed",
            "data": {"object": {
                "customer": customer,
                "metadata": {"supabaseUserId": user}
            }}
        })
        .to_string()
    }

    fn subscription_payload(kind: &str, customer: &str, status: &str) -> String {
        serde_json::json!({
            "id": "evt_sub",
            "type": kind,
            "data": {"object": {"customer": customer, "status": status}}
        })
        .to_string()
    }

    async fn deliver(
        profiles: &MemoryProfileStore,
        payload: &str,
    ) -> Result<BillingOutcome, BillingError> {
        let secret = secret();
        let service = BillingService::new(profiles, Some(&secret));
        let header = sign_webhook(payload, NOW);
        service.handle_webhook_at(payload.as_bytes(), Some(&header), NOW).await
    }

    async fn seeded() -> (MemoryProfileStore, UserId) {
        let profiles = MemoryProfileStore::new();
        let user = UserId::parse("u1").unwrap();
        profiles.seed(&user, 3, SubscriptionStatus::None).await;
        (profiles, user)
    }

    #[tokio::test]
    async fn test_checkout_links_customer_and_activates() {
        let (profiles, user) = seeded().await;

        let outcome = deliver(&profiles, &checkout_payload("u1", "cus_1")).await;

        assert_eq!(outcome.unwrap(), BillingOutcome::Applied);
        let profile = profiles.get(&user).await.unwrap().unwrap();
        assert_eq!(profile.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(profile.subscription_status, SubscriptionStatus::Active);
        assert_eq!(profile.credits_remaining, 3);
    }

    #[tokio::test]
    async fn test_checkout_replay_matches_single_delivery() {
        let (profiles, user) = seeded().await;
        let payload = checkout_payload("u1", "cus_1");

        deliver(&profiles, &payload).await.unwrap();
        let once = profiles.get(&user).await.unwrap().unwrap();
        let replay = deliver(&profiles, &payload).await.unwrap();
        let twice = profiles.get(&user).await.unwrap().unwrap();

        assert_eq!(replay, BillingOutcome::Unchanged);
        assert_eq!(once.billing_state(), twice.billing_state());
        assert_eq!(once.credits_remaining, twice.credits_remaining);
    }

    #[tokio::test]
    async fn test_subscription_lifecycle_by_customer() {
        let (profiles, user) = seeded().await;
        deliver(&profiles, &checkout_payload("u1", "cus_1"))
            .await
            .unwrap();

        let past_due =
            subscription_payload("customer.subscription.updated", "cus_1", "past_due");
        assert_eq!(
            deliver(&profiles, &past_due).await.unwrap(),
            BillingOutcome::Applied
        );
        assert_eq!(
            profiles.get(&user).await.unwrap().unwrap().subscription_status,
            SubscriptionStatus::Canceled
        );

        let active = subscription_payload("customer.subscription.updated", "cus_1", "active");
        deliver(&profiles, &active).await.unwrap();
        assert!(
            profiles
                .get(&user)
                .await
                .unwrap()
                .unwrap()
                .subscription_status
                .is_active()
        );

        let deleted = subscription_payload("customer.subscription.deleted", "cus_1", "canceled");
        deliver(&profiles, &deleted).await.unwrap();
        let profile = profiles.get(&user).await.unwrap().unwrap();
        assert_eq!(profile.subscription_status, SubscriptionStatus::Canceled);
        assert_eq!(profile.stripe_customer_id.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn test_unknown_customer_is_acknowledged_without_change() {
        let (profiles, user) = seeded().await;
        let before = profiles.get(&user).await.unwrap().unwrap();

        let payload =
            subscription_payload("customer.subscription.deleted", "cus_unknown", "canceled");
        let outcome = deliver(&profiles, &payload).await.unwrap();

        assert_eq!(outcome, BillingOutcome::ProfileLookupMiss);
        assert_eq!(profiles.get(&user).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_unknown_event_type_is_ignored() {
        let (profiles, _) = seeded().await;
        let payload = r#"{"id":"evt_x","type":"invoice.paid","data":{"object":{}}}"#;
        assert_eq!(
            deliver(&profiles, payload).await.unwrap(),
            BillingOutcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_invalid_signature_mutates_nothing() {
        let (profiles, user) = seeded().await;
        let before = profiles.get(&user).await.unwrap().unwrap();
        let secret = secret();
        let service = BillingService::new(&profiles, Some(&secret));
        let payload = checkout_payload("u1", "cus_1");

        let bad = service
            .handle_webhook_at(payload.as_bytes(), Some("t=1700000000,v1=00ff"), NOW)
            .await;
        let missing = service.handle_webhook_at(payload.as_bytes(), None, NOW).await;

        assert!(matches!(bad, Err(BillingError::InvalidSignature(_))));
        assert!(matches!(
            missing,
            Err(BillingError::InvalidSignature(WebhookError::MissingHeader))
        ));
        assert_eq!(profiles.get(&user).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_signed_garbage_is_malformed() {
        let (profiles, _) = seeded().await;
        let result = deliver(&profiles, "not json").await;
        assert!(matches!(result, Err(BillingError::MalformedPayload(_))));
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_configured() {
        let (profiles, _) = seeded().await;
        let service = BillingService::new(&profiles, None);
        let result = service.handle_webhook_at(b"{}", Some("t=1,v1=00"), NOW).await;
        assert!(matches!(result, Err(BillingError::NotConfigured)));
    }
}
