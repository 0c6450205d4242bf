//! Test doubles and fixtures shared by unit and integration tests.
//!
//! Enabled for this crate's tests and, in other crates, through the
//! `test-support` feature.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use tokio::sync::Mutex;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use propscribe_core::{PropertyDetails, UserId};

use crate::anthropic::{ClaudeError, TextGenerator};
use crate::config::{ServerConfig, StripeConfig};
use crate::db::memory::{MemoryGenerationStore, MemoryListingStore, MemoryProfileStore};
use crate::identity::{IdentityError, IdentityProvider, IdentityUser};
use crate::middleware::session::session_layer;
use crate::state::{AppState, Providers, Stores};
use crate::stripe::{PaymentProvider, StripeError};

/// Webhook signing secret used by [`test_config`].
pub const TEST_WEBHOOK_SECRET: &str = "whsec_Xk29qLmR7vNp4TzA8bYc";

/// Checkout URL returned by [`StubPayments`].
pub const STUB_CHECKOUT_URL: &str = "https://checkout.stripe.test/c/pay/cs_test_stub";

/// Identity code that [`StubIdentity`] rejects.
pub const REJECTED_CODE: &str = "rejected-code";

/// Configuration with no real providers and a known webhook secret.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/propscribe_test".to_string()),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: Some("http://localhost:3000".to_string()),
        session_secret: SecretString::from("k8Jz2mQv9XpL4rTn7WbY1cHf6GdS3aEu".to_string()),
        anthropic: None,
        stripe: StripeConfig {
            secret_key: None,
            webhook_secret: Some(SecretString::from(TEST_WEBHOOK_SECRET.to_string())),
            price_id: None,
        },
        identity: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A complete, valid property.
#[must_use]
pub fn sample_details() -> PropertyDetails {
    PropertyDetails {
        property_type: "Apartment".to_string(),
        size: "85 m²".to_string(),
        bedrooms: 2,
        bathrooms: 1,
        location: "Lisbon".to_string(),
        amenities: "Balcony, lift".to_string(),
        unique_selling_points: "Tagus river view".to_string(),
        style: "professional".to_string(),
        language: "English".to_string(),
    }
}

/// `Stripe-Signature` header for `payload` signed with [`TEST_WEBHOOK_SECRET`].
#[must_use]
pub fn sign_webhook(payload: impl AsRef<[u8]>, timestamp: i64) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(TEST_WEBHOOK_SECRET.as_bytes()) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload.as_ref());
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

// =============================================================================
// Providers
// =============================================================================

/// Text generator that returns a fixed reply and records every prompt.
pub struct ScriptedGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A generator whose every call fails like an overloaded API.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> usize {
        self.prompts.lock().await.len()
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ClaudeError> {
        self.prompts.lock().await.push(prompt.to_owned());
        self.reply.clone().ok_or_else(|| ClaudeError::Api {
            error_type: "overloaded_error".to_string(),
            message: "Overloaded".to_string(),
        })
    }
}

/// A checkout session request seen by [`StubPayments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubSession {
    pub customer_id: String,
    pub user_id: UserId,
    pub success_url: String,
    pub cancel_url: String,
}

/// Payment provider that records requests and never leaves the process.
#[derive(Default)]
pub struct StubPayments {
    customers: Mutex<Vec<(Option<String>, UserId)>>,
    sessions: Mutex<Vec<StubSession>>,
}

impl StubPayments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(email, user)` for every customer created.
    pub async fn customers(&self) -> Vec<(Option<String>, UserId)> {
        self.customers.lock().await.clone()
    }

    pub async fn sessions(&self) -> Vec<StubSession> {
        self.sessions.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProvider for StubPayments {
    async fn create_customer(
        &self,
        email: Option<&str>,
        user_id: &UserId,
    ) -> Result<String, StripeError> {
        let mut customers = self.customers.lock().await;
        customers.push((email.map(str::to_owned), user_id.clone()));
        Ok(format!("cus_stub_{}", customers.len()))
    }

    async fn create_checkout_session(
        &self,
        customer_id: &str,
        user_id: &UserId,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, StripeError> {
        self.sessions.lock().await.push(StubSession {
            customer_id: customer_id.to_owned(),
            user_id: user_id.clone(),
            success_url: success_url.to_owned(),
            cancel_url: cancel_url.to_owned(),
        });
        Ok(STUB_CHECKOUT_URL.to_string())
    }
}

/// Identity provider where the authorization code is the user id.
///
/// The exchanged user gets the email `{code}@example.com`; the code
/// [`REJECTED_CODE`] is refused.
#[derive(Default)]
pub struct StubIdentity {
    exchanges: AtomicUsize,
}

impl StubIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    fn authorize_url(
        &self,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, IdentityError> {
        url::Url::parse_with_params(
            "https://identity.test/auth/v1/authorize",
            &[("redirect_to", redirect_to), ("code_challenge", code_challenge)],
        )
        .map(Into::into)
        .map_err(|e| IdentityError::Parse(e.to_string()))
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<IdentityUser, IdentityError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code == REJECTED_CODE || code_verifier.is_empty() {
            return Err(IdentityError::Rejected {
                status: 400,
                message: "invalid grant".to_string(),
            });
        }
        let id = UserId::parse(code).map_err(|e| IdentityError::InvalidUser(e.to_string()))?;
        Ok(IdentityUser {
            id,
            email: Some(format!("{code}@example.com")),
        })
    }
}

// =============================================================================
// Harness
// =============================================================================

/// In-memory application: stores, stub providers, and a router over them.
pub struct TestHarness {
    pub profiles: Arc<MemoryProfileStore>,
    pub generations: Arc<MemoryGenerationStore>,
    pub listings: Arc<MemoryListingStore>,
    pub generator: Arc<ScriptedGenerator>,
    pub payments: Arc<StubPayments>,
    pub identity: Arc<StubIdentity>,
    state: AppState,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Harness whose generator replies with a fixed description.
    #[must_use]
    pub fn new() -> Self {
        Self::with_generator(ScriptedGenerator::replying(
            "Sun-filled two-bedroom apartment with sweeping river views.",
        ))
    }

    #[must_use]
    pub fn with_generator(generator: ScriptedGenerator) -> Self {
        Self::assemble(generator, test_config())
    }

    /// Harness whose state carries `config` instead of [`test_config`].
    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        Self::assemble(
            ScriptedGenerator::replying("A generated description."),
            config,
        )
    }

    fn assemble(generator: ScriptedGenerator, config: ServerConfig) -> Self {
        let profiles = Arc::new(MemoryProfileStore::new());
        let generations = Arc::new(MemoryGenerationStore::new());
        let listings = Arc::new(MemoryListingStore::new());
        let generator = Arc::new(generator);
        let payments = Arc::new(StubPayments::new());
        let identity = Arc::new(StubIdentity::new());

        let stores = Stores {
            profiles: profiles.clone(),
            generations: generations.clone(),
            listings: listings.clone(),
        };
        let providers = Providers {
            generator: Some(generator.clone()),
            payments: Some(payments.clone()),
            identity: Some(identity.clone()),
        };
        let state = AppState::from_parts(config, None, stores, providers);

        Self {
            profiles,
            generations,
            listings,
            generator,
            payments,
            identity,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Full router with an in-memory session store.
    ///
    /// Build it once per test and clone it per request so the session store
    /// is shared.
    #[must_use]
    pub fn router(&self) -> Router {
        let layer: SessionManagerLayer<MemoryStore> =
            session_layer(MemoryStore::default(), self.state.config());
        crate::routes::app(self.state(), layer)
    }
}
