//! Subscription checkout.

use thiserror::Error;
use tracing::instrument;

use propscribe_core::UserId;

use crate::db::{ProfileStore, RepositoryError};
use crate::stripe::{PaymentProvider, StripeError};

/// Errors that prevent a checkout session from being opened.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("profile not found")]
    ProfileNotFound,

    #[error("payments are not configured")]
    NotConfigured,

    #[error("payment provider error: {0}")]
    Provider(#[from] StripeError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Opens hosted checkout sessions, creating the billing customer on first use.
pub struct CheckoutService<'a> {
    profiles: &'a dyn ProfileStore,
    payments: Option<&'a dyn PaymentProvider>,
    base_url: Option<&'a str>,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        profiles: &'a dyn ProfileStore,
        payments: Option<&'a dyn PaymentProvider>,
        base_url: Option<&'a str>,
    ) -> Self {
        Self {
            profiles,
            payments,
            base_url,
        }
    }

    /// Start a subscription checkout and return the hosted page URL.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotConfigured` without a payment provider or
    /// public base URL, `CheckoutError::ProfileNotFound` if the caller has no
    /// profile, and `CheckoutError::Provider` if the payment provider fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn start(&self, user_id: &UserId) -> Result<String, CheckoutError> {
        let payments = self.payments.ok_or(CheckoutError::NotConfigured)?;
        let base_url = self.base_url.ok_or(CheckoutError::NotConfigured)?;
        let profile = self
            .profiles
            .get(user_id)
            .await?
            .ok_or(CheckoutError::ProfileNotFound)?;

        let customer_id = if let Some(customer_id) = profile.stripe_customer_id {
            customer_id
        } else {
            let customer_id = payments
                .create_customer(profile.email.as_deref(), user_id)
                .await?;
            self.profiles
                .set_stripe_customer(user_id, &customer_id)
                .await?;
            customer_id
        };

        let success_url = format!("{base_url}/dashboard?checkout=success");
        let cancel_url = format!("{base_url}/pricing?checkout=canceled");

        let url = payments
            .create_checkout_session(&customer_id, user_id, &success_url, &cancel_url)
            .await?;

        tracing::info!(customer_id = %customer_id, "Checkout session opened");
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use propscribe_core::SubscriptionStatus;

    use super::*;
    use crate::db::memory::MemoryProfileStore;
    use crate::testing::{STUB_CHECKOUT_URL, StubPayments};

    const BASE: &str = "https://app.test";

    #[tokio::test]
    async fn test_first_checkout_creates_and_links_customer() {
        let profiles = MemoryProfileStore::new();
        let user = UserId::parse("u1").unwrap();
        profiles.ensure(&user, Some("agent@example.com")).await.unwrap();
        let payments = StubPayments::new();

        let url = CheckoutService::new(&profiles, Some(&payments), Some(BASE))
            .start(&user)
            .await
            .unwrap();

        assert_eq!(url, STUB_CHECKOUT_URL);
        let customers = payments.customers().await;
        assert_eq!(
            customers,
            [(Some("agent@example.com".to_string()), user.clone())]
        );
        let profile = profiles.get(&user).await.unwrap().unwrap();
        assert_eq!(profile.stripe_customer_id.as_deref(), Some("cus_stub_1"));

        let sessions = payments.sessions().await;
        let session = sessions.first().unwrap();
        assert_eq!(session.customer_id, "cus_stub_1");
        assert_eq!(session.success_url, "https://app.test/dashboard?checkout=success");
        assert_eq!(session.cancel_url, "https://app.test/pricing?checkout=canceled");
    }

    #[tokio::test]
    async fn test_existing_customer_is_reused() {
        let profiles = MemoryProfileStore::new();
        let user = UserId::parse("u1").unwrap();
        profiles.seed(&user, 0, SubscriptionStatus::Canceled).await;
        profiles.set_stripe_customer(&user, "cus_old").await.unwrap();
        let payments = StubPayments::new();

        CheckoutService::new(&profiles, Some(&payments), Some(BASE))
            .start(&user)
            .await
            .unwrap();

        assert!(payments.customers().await.is_empty());
        assert_eq!(
            payments.sessions().await.first().unwrap().customer_id,
            "cus_old"
        );
    }

    #[tokio::test]
    async fn test_missing_profile_and_unconfigured() {
        let profiles = MemoryProfileStore::new();
        let user = UserId::parse("ghost").unwrap();
        let payments = StubPayments::new();

        let missing = CheckoutService::new(&profiles, Some(&payments), Some(BASE))
            .start(&user)
            .await;
        assert!(matches!(missing, Err(CheckoutError::ProfileNotFound)));

        let unconfigured = CheckoutService::new(&profiles, None, Some(BASE)).start(&user).await;
        assert!(matches!(unconfigured, Err(CheckoutError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_missing_base_url_opens_nothing() {
        let profiles = MemoryProfileStore::new();
        let user = UserId::parse("u1").unwrap();
        profiles.ensure(&user, Some("agent@example.com")).await.unwrap();
        let payments = StubPayments::new();

        let result = CheckoutService::new(&profiles, Some(&payments), None)
            .start(&user)
            .await;

        assert!(matches!(result, Err(CheckoutError::NotConfigured)));
        assert!(payments.customers().await.is_empty());
        assert!(payments.sessions().await.is_empty());
        let profile = profiles.get(&user).await.unwrap().unwrap();
        assert_eq!(profile.stripe_customer_id, None);
    }
}
