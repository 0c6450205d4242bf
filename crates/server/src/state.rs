//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::anthropic::{ClaudeClient, ClaudeError, TextGenerator};
use crate::config::ServerConfig;
use crate::db::{
    GenerationStore, ListingStore, PgGenerationStore, PgListingStore, PgProfileStore,
    ProfileStore,
};
use crate::identity::{IdentityClient, IdentityError, IdentityProvider};
use crate::services::{BillingService, CheckoutService, GenerationService, LibraryService};
use crate::stripe::{PaymentProvider, StripeClient, StripeError};

/// Error building provider clients from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("anthropic client: {0}")]
    Claude(#[from] ClaudeError),
    #[error("stripe client: {0}")]
    Stripe(#[from] StripeError),
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
}

/// Persistence backends.
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub generations: Arc<dyn GenerationStore>,
    pub listings: Arc<dyn ListingStore>,
}

impl Stores {
    /// `PostgreSQL` stores sharing one pool.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            profiles: Arc::new(PgProfileStore::new(pool.clone())),
            generations: Arc::new(PgGenerationStore::new(pool.clone())),
            listings: Arc::new(PgListingStore::new(pool.clone())),
        }
    }
}

/// External providers. Each is absent when not configured.
#[derive(Clone, Default)]
pub struct Providers {
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub payments: Option<Arc<dyn PaymentProvider>>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl Providers {
    /// Build real clients for every provider present in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured client cannot be constructed.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StateError> {
        let generator = match &config.anthropic {
            Some(anthropic) => {
                Some(Arc::new(ClaudeClient::new(anthropic)?) as Arc<dyn TextGenerator>)
            }
            None => {
                tracing::warn!("ANTHROPIC_API_KEY not set, generation is disabled");
                None
            }
        };

        let payments = match (&config.stripe.secret_key, &config.stripe.price_id) {
            (Some(key), Some(price)) => {
                Some(Arc::new(StripeClient::new(key, price.clone())?) as Arc<dyn PaymentProvider>)
            }
            _ => {
                tracing::warn!("STRIPE_SECRET_KEY or STRIPE_PRICE_ID not set, checkout is disabled");
                None
            }
        };
        if config.base_url.is_none() {
            tracing::warn!("PROPSCRIBE_BASE_URL not set, sign-in and checkout are disabled");
        }
        if config.stripe.webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set, billing webhooks will be rejected");
        }

        let identity = match &config.identity {
            Some(identity) => {
                Some(Arc::new(IdentityClient::new(identity)?) as Arc<dyn IdentityProvider>)
            }
            None => {
                tracing::warn!("IDENTITY_URL or IDENTITY_ANON_KEY not set, sign-in is disabled");
                None
            }
        };

        Ok(Self {
            generator,
            payments,
            identity,
        })
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like stores, provider clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: Option<PgPool>,
    stores: Stores,
    providers: Providers,
}

impl AppState {
    /// Create the production state: `PostgreSQL` stores and real providers.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured provider client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let stores = Stores::postgres(&pool);
        let providers = Providers::from_config(&config)?;
        Ok(Self::from_parts(config, Some(pool), stores, providers))
    }

    /// Assemble state from explicit parts.
    #[must_use]
    pub fn from_parts(
        config: ServerConfig,
        pool: Option<PgPool>,
        stores: Stores,
        providers: Providers,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                stores,
                providers,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Database pool, absent when running on in-memory stores.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn profiles(&self) -> &dyn ProfileStore {
        self.inner.stores.profiles.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&dyn IdentityProvider> {
        self.inner.providers.identity.as_deref()
    }

    #[must_use]
    pub fn generation_service(&self) -> GenerationService<'_> {
        GenerationService::new(
            self.inner.stores.profiles.as_ref(),
            self.inner.stores.generations.as_ref(),
            self.inner.providers.generator.as_deref(),
        )
    }

    #[must_use]
    pub fn billing_service(&self) -> BillingService<'_> {
        BillingService::new(
            self.inner.stores.profiles.as_ref(),
            self.inner.config.stripe.webhook_secret.as_ref(),
        )
    }

    #[must_use]
    pub fn checkout_service(&self) -> CheckoutService<'_> {
        CheckoutService::new(
            self.inner.stores.profiles.as_ref(),
            self.inner.providers.payments.as_deref(),
            self.inner.config.base_url.as_deref(),
        )
    }

    #[must_use]
    pub fn library_service(&self) -> LibraryService<'_> {
        LibraryService::new(
            self.inner.stores.generations.as_ref(),
            self.inner.stores.listings.as_ref(),
        )
    }
}
