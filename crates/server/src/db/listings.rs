//! Saved listing repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use propscribe_core::{ListingId, PropertyDetails, UserId};

use super::{ListingStore, RepositoryError};
use crate::models::{Listing, NewListing};

const LISTING_COLUMNS: &str = "id, user_id, title, description, details, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: ListingId,
    user_id: String,
    title: String,
    description: String,
    details: Json<PropertyDetails>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = RepositoryError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let user_id = UserId::parse(&row.user_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid user id on listing {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            user_id,
            title: row.title,
            description: row.description,
            details: row.details.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL`-backed [`ListingStore`].
#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    /// Create a new listing repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn insert(
        &self,
        user_id: &UserId,
        listing: &NewListing,
    ) -> Result<Listing, RepositoryError> {
        let sql = format!(
            "INSERT INTO listings (user_id, title, description, details) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {LISTING_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(user_id.as_str())
            .bind(&listing.title)
            .bind(&listing.description)
            .bind(Json(&listing.details))
            .fetch_one(&self.pool)
            .await?;

        Listing::try_from(row)
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<Listing>, RepositoryError> {
        let sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings \
             WHERE user_id = $1 \
             ORDER BY updated_at DESC, id DESC"
        );
        sqlx::query_as::<_, ListingRow>(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Listing::try_from)
            .collect()
    }

    async fn get(
        &self,
        user_id: &UserId,
        id: ListingId,
    ) -> Result<Option<Listing>, RepositoryError> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Listing::try_from)
            .transpose()
    }

    async fn update_description(
        &self,
        user_id: &UserId,
        id: ListingId,
        description: &str,
    ) -> Result<Option<Listing>, RepositoryError> {
        let sql = format!(
            "UPDATE listings SET description = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {LISTING_COLUMNS}"
        );
        sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .bind(user_id.as_str())
            .bind(description)
            .fetch_optional(&self.pool)
            .await?
            .map(Listing::try_from)
            .transpose()
    }

    async fn delete(&self, user_id: &UserId, id: ListingId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
