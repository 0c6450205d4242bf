//! Database operations for the Propscribe `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `profiles` - Credits and subscription state per identity-provider user
//! - `generations` - Generated descriptions with their input snapshot
//! - `listings` - Listings saved explicitly by their owner
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Every read, update and delete of a generation or listing carries the
//! owner in its `WHERE` clause. A row owned by someone else behaves exactly
//! like a missing row.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p propscribe-cli -- migrate
//! ```

pub mod generations;
pub mod listings;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod profiles;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use propscribe_core::{BillingState, GenerationId, ListingId, PropertyDetails, UserId};

use crate::models::{DebitOutcome, Generation, Listing, NewListing, Profile};

pub use generations::PgGenerationStore;
pub use listings::PgListingStore;
pub use profiles::PgProfileStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Simulated failure from an in-memory store.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Profile persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile by user.
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, RepositoryError>;

    /// Return the user's profile, creating it with the starting credits if absent.
    async fn ensure(
        &self,
        user_id: &UserId,
        email: Option<&str>,
    ) -> Result<Profile, RepositoryError>;

    /// Fetch the profile linked to a payment-provider customer.
    async fn find_by_customer(&self, customer_id: &str)
    -> Result<Option<Profile>, RepositoryError>;

    /// Consume one credit unless the user is subscribed or out of credits.
    ///
    /// The decision and the write happen in a single statement, so two
    /// concurrent requests can never both take the last credit.
    async fn debit_credit(&self, user_id: &UserId) -> Result<DebitOutcome, RepositoryError>;

    /// Overwrite the billing fields with absolute values.
    async fn apply_billing(
        &self,
        user_id: &UserId,
        state: &BillingState,
    ) -> Result<(), RepositoryError>;

    /// Link a payment-provider customer to the profile.
    async fn set_stripe_customer(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), RepositoryError>;

    /// Add credits administratively. Returns the updated profile.
    async fn grant_credits(
        &self,
        user_id: &UserId,
        credits: i32,
    ) -> Result<Option<Profile>, RepositoryError>;
}

/// Generation history persistence, scoped by owner.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn insert(
        &self,
        user_id: &UserId,
        input: &PropertyDetails,
        output_text: &str,
    ) -> Result<Generation, RepositoryError>;

    /// Newest first.
    async fn list(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Generation>, RepositoryError>;

    async fn get(
        &self,
        user_id: &UserId,
        id: GenerationId,
    ) -> Result<Option<Generation>, RepositoryError>;

    async fn update_output(
        &self,
        user_id: &UserId,
        id: GenerationId,
        output_text: &str,
    ) -> Result<Option<Generation>, RepositoryError>;

    /// Returns the number of rows removed (0 when missing or not owned).
    async fn delete(&self, user_id: &UserId, id: GenerationId) -> Result<u64, RepositoryError>;
}

/// Saved listing persistence, scoped by owner.
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert(
        &self,
        user_id: &UserId,
        listing: &NewListing,
    ) -> Result<Listing, RepositoryError>;

    /// Most recently updated first.
    async fn list(&self, user_id: &UserId) -> Result<Vec<Listing>, RepositoryError>;

    async fn get(&self, user_id: &UserId, id: ListingId)
    -> Result<Option<Listing>, RepositoryError>;

    async fn update_description(
        &self,
        user_id: &UserId,
        id: ListingId,
        description: &str,
    ) -> Result<Option<Listing>, RepositoryError>;

    /// Returns the number of rows removed (0 when missing or not owned).
    async fn delete(&self, user_id: &UserId, id: ListingId) -> Result<u64, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
