//! In-memory store implementations for tests.
//!
//! They honour the same contracts as the `PostgreSQL` stores: ownership is
//! part of every lookup and the credit debit is decided and applied under a
//! single lock. Failure switches let tests exercise the degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use propscribe_core::{
    BillingState, GenerationId, ListingId, PropertyDetails, STARTING_CREDITS, SubscriptionStatus,
    UserId,
};

use super::{GenerationStore, ListingStore, ProfileStore, RepositoryError};
use crate::models::{DebitOutcome, Generation, Listing, NewListing, Profile};

/// In-memory [`ProfileStore`].
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<UserId, Profile>>,
    fail_debits: AtomicBool,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile with the given balance and status.
    pub async fn seed(&self, user_id: &UserId, credits: i32, status: SubscriptionStatus) {
        let now = Utc::now();
        self.profiles.write().await.insert(
            user_id.clone(),
            Profile {
                user_id: user_id.clone(),
                email: None,
                credits_remaining: credits,
                subscription_status: status,
                stripe_customer_id: None,
                created_at: now,
                updated_at: now,
            },
        );
    }

    /// Make every subsequent debit fail with a store error.
    pub fn fail_debits(&self, fail: bool) {
        self.fail_debits.store(fail, Ordering::SeqCst);
    }

    /// Number of stored profiles.
    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    /// Whether no profile is stored.
    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn ensure(
        &self,
        user_id: &UserId,
        email: Option<&str>,
    ) -> Result<Profile, RepositoryError> {
        let mut profiles = self.profiles.write().await;
        let now = Utc::now();
        let profile = profiles.entry(user_id.clone()).or_insert_with(|| Profile {
            user_id: user_id.clone(),
            email: None,
            credits_remaining: STARTING_CREDITS,
            subscription_status: SubscriptionStatus::None,
            stripe_customer_id: None,
            created_at: now,
            updated_at: now,
        });
        if profile.email.is_none() {
            profile.email = email.map(str::to_owned);
        }
        Ok(profile.clone())
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Profile>, RepositoryError> {
        Ok(self
            .profiles
            .read()
            .await
            .values()
            .find(|p| p.stripe_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn debit_credit(&self, user_id: &UserId) -> Result<DebitOutcome, RepositoryError> {
        if self.fail_debits.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("debit disabled".to_string()));
        }

        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(user_id).ok_or(RepositoryError::NotFound)?;

        if profile.subscription_status.is_active() {
            return Ok(DebitOutcome::Unlimited);
        }
        if profile.credits_remaining <= 0 {
            return Ok(DebitOutcome::Exhausted);
        }

        profile.credits_remaining -= 1;
        profile.updated_at = Utc::now();
        Ok(DebitOutcome::Debited {
            remaining: profile.credits_remaining,
        })
    }

    async fn apply_billing(
        &self,
        user_id: &UserId,
        state: &BillingState,
    ) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(user_id).ok_or(RepositoryError::NotFound)?;
        profile.subscription_status = state.subscription_status;
        profile.stripe_customer_id.clone_from(&state.stripe_customer_id);
        profile.updated_at = Utc::now();
        Ok(())
    }

    async fn set_stripe_customer(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(user_id).ok_or(RepositoryError::NotFound)?;
        profile.stripe_customer_id = Some(customer_id.to_owned());
        profile.updated_at = Utc::now();
        Ok(())
    }

    async fn grant_credits(
        &self,
        user_id: &UserId,
        credits: i32,
    ) -> Result<Option<Profile>, RepositoryError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(user_id).map(|profile| {
            profile.credits_remaining += credits;
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }
}

/// In-memory [`GenerationStore`].
#[derive(Default)]
pub struct MemoryGenerationStore {
    rows: RwLock<Vec<Generation>>,
    next_id: AtomicI32,
    fail_inserts: AtomicBool,
}

impl MemoryGenerationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent insert fail with a store error.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// All stored generations regardless of owner.
    pub async fn all(&self) -> Vec<Generation> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl GenerationStore for MemoryGenerationStore {
    async fn insert(
        &self,
        user_id: &UserId,
        input: &PropertyDetails,
        output_text: &str,
    ) -> Result<Generation, RepositoryError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("insert disabled".to_string()));
        }

        let generation = Generation {
            id: GenerationId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            user_id: user_id.clone(),
            input: input.clone(),
            output_text: output_text.to_owned(),
            created_at: Utc::now(),
        };
        self.rows.write().await.push(generation.clone());
        Ok(generation)
    }

    async fn list(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Generation>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .filter(|g| &g.user_id == user_id)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        user_id: &UserId,
        id: GenerationId,
    ) -> Result<Option<Generation>, RepositoryError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|g| g.id == id && &g.user_id == user_id)
            .cloned())
    }

    async fn update_output(
        &self,
        user_id: &UserId,
        id: GenerationId,
        output_text: &str,
    ) -> Result<Option<Generation>, RepositoryError> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .iter_mut()
            .find(|g| g.id == id && &g.user_id == user_id)
            .map(|g| {
                output_text.clone_into(&mut g.output_text);
                g.clone()
            }))
    }

    async fn delete(&self, user_id: &UserId, id: GenerationId) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|g| !(g.id == id && &g.user_id == user_id));
        Ok(u64::try_from(before - rows.len()).unwrap_or(0))
    }
}

/// In-memory [`ListingStore`].
#[derive(Default)]
pub struct MemoryListingStore {
    rows: RwLock<Vec<Listing>>,
    next_id: AtomicI32,
}

impl MemoryListingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored listings regardless of owner.
    pub async fn all(&self) -> Vec<Listing> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl ListingStore for MemoryListingStore {
    async fn insert(
        &self,
        user_id: &UserId,
        listing: &NewListing,
    ) -> Result<Listing, RepositoryError> {
        let now = Utc::now();
        let listing = Listing {
            id: ListingId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
            user_id: user_id.clone(),
            title: listing.title.clone(),
            description: listing.description.clone(),
            details: listing.details.clone(),
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.push(listing.clone());
        Ok(listing)
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<Listing>, RepositoryError> {
        let mut listings: Vec<Listing> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|l| &l.user_id == user_id)
            .cloned()
            .collect();
        listings.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(b.id.as_i32().cmp(&a.id.as_i32()))
        });
        Ok(listings)
    }

    async fn get(
        &self,
        user_id: &UserId,
        id: ListingId,
    ) -> Result<Option<Listing>, RepositoryError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|l| l.id == id && &l.user_id == user_id)
            .cloned())
    }

    async fn update_description(
        &self,
        user_id: &UserId,
        id: ListingId,
        description: &str,
    ) -> Result<Option<Listing>, RepositoryError> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .iter_mut()
            .find(|l| l.id == id && &l.user_id == user_id)
            .map(|l| {
                description.clone_into(&mut l.description);
                l.updated_at = Utc::now();
                l.clone()
            }))
    }

    async fn delete(&self, user_id: &UserId, id: ListingId) -> Result<u64, RepositoryError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|l| !(l.id == id && &l.user_id == user_id));
        Ok(u64::try_from(before - rows.len()).unwrap_or(0))
    }
}
