//! Profile repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use propscribe_core::{BillingState, STARTING_CREDITS, SubscriptionStatus, UserId};

use super::{ProfileStore, RepositoryError};
use crate::models::{DebitOutcome, Profile};

const PROFILE_COLUMNS: &str = "user_id, email, credits_remaining, subscription_status, \
                               stripe_customer_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    email: Option<String>,
    credits_remaining: i32,
    subscription_status: SubscriptionStatus,
    stripe_customer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let user_id = UserId::parse(&row.user_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid user id in database: {e}"))
        })?;

        Ok(Self {
            user_id,
            email: row.email,
            credits_remaining: row.credits_remaining,
            subscription_status: row.subscription_status,
            stripe_customer_id: row.stripe_customer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL`-backed [`ProfileStore`].
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn ensure(
        &self,
        user_id: &UserId,
        email: Option<&str>,
    ) -> Result<Profile, RepositoryError> {
        // DO UPDATE (instead of DO NOTHING) so RETURNING yields the existing row.
        let sql = format!(
            "INSERT INTO profiles (user_id, email, credits_remaining) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE \
                SET email = COALESCE(profiles.email, EXCLUDED.email) \
             RETURNING {PROFILE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(user_id.as_str())
            .bind(email)
            .bind(STARTING_CREDITS)
            .fetch_one(&self.pool)
            .await?;

        Profile::try_from(row)
    }

    async fn find_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Profile>, RepositoryError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE stripe_customer_id = $1");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn debit_credit(&self, user_id: &UserId) -> Result<DebitOutcome, RepositoryError> {
        let remaining: Option<i32> = sqlx::query_scalar(
            "UPDATE profiles \
             SET credits_remaining = credits_remaining - 1, updated_at = NOW() \
             WHERE user_id = $1 \
               AND subscription_status <> 'active' \
               AND credits_remaining > 0 \
             RETURNING credits_remaining",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(DebitOutcome::Debited { remaining });
        }

        // Nothing was decremented: either subscribed or out of credits.
        let status: Option<SubscriptionStatus> =
            sqlx::query_scalar("SELECT subscription_status FROM profiles WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match status {
            Some(SubscriptionStatus::Active) => Ok(DebitOutcome::Unlimited),
            Some(_) => Ok(DebitOutcome::Exhausted),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn apply_billing(
        &self,
        user_id: &UserId,
        state: &BillingState,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE profiles \
             SET subscription_status = $2, stripe_customer_id = $3, updated_at = NOW() \
             WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .bind(state.subscription_status)
        .bind(state.stripe_customer_id.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_stripe_customer(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE profiles SET stripe_customer_id = $2, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn grant_credits(
        &self,
        user_id: &UserId,
        credits: i32,
    ) -> Result<Option<Profile>, RepositoryError> {
        let sql = format!(
            "UPDATE profiles \
             SET credits_remaining = credits_remaining + $2, updated_at = NOW() \
             WHERE user_id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(user_id.as_str())
            .bind(credits)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }
}
