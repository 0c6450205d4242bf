//! Stripe integration: customers, subscription checkout, and webhook events.
//!
//! Outbound calls go through [`PaymentProvider`] so the checkout flow can be
//! exercised without network access. Inbound webhooks are verified and parsed
//! by the pure functions in [`webhook`].

pub mod client;
pub mod error;
pub mod webhook;

use async_trait::async_trait;
use propscribe_core::UserId;

pub use client::StripeClient;
pub use error::StripeError;
pub use webhook::{ParsedEvent, WebhookError, parse_event, verify_signature};

/// Outbound payment provider operations used by checkout.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a billing customer tagged with the user's id.
    ///
    /// Returns the provider's customer id.
    async fn create_customer(
        &self,
        email: Option<&str>,
        user_id: &UserId,
    ) -> Result<String, StripeError>;

    /// Open a subscription checkout session and return its hosted URL.
    async fn create_checkout_session(
        &self,
        customer_id: &str,
        user_id: &UserId,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, StripeError>;
}
