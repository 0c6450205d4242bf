//! Generation history repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use propscribe_core::{GenerationId, PropertyDetails, UserId};

use super::{GenerationStore, RepositoryError};
use crate::models::Generation;

const GENERATION_COLUMNS: &str = "id, user_id, input, output_text, created_at";

#[derive(sqlx::FromRow)]
struct GenerationRow {
    id: GenerationId,
    user_id: String,
    input: Json<PropertyDetails>,
    output_text: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<GenerationRow> for Generation {
    type Error = RepositoryError;

    fn try_from(row: GenerationRow) -> Result<Self, Self::Error> {
        let user_id = UserId::parse(&row.user_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid user id on generation {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            user_id,
            input: row.input.0,
            output_text: row.output_text,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL`-backed [`GenerationStore`].
#[derive(Clone)]
pub struct PgGenerationStore {
    pool: PgPool,
}

impl PgGenerationStore {
    /// Create a new generation repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenerationStore for PgGenerationStore {
    async fn insert(
        &self,
        user_id: &UserId,
        input: &PropertyDetails,
        output_text: &str,
    ) -> Result<Generation, RepositoryError> {
        let sql = format!(
            "INSERT INTO generations (user_id, input, output_text) \
             VALUES ($1, $2, $3) \
             RETURNING {GENERATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, GenerationRow>(&sql)
            .bind(user_id.as_str())
            .bind(Json(input))
            .bind(output_text)
            .fetch_one(&self.pool)
            .await?;

        Generation::try_from(row)
    }

    async fn list(
        &self,
        user_id: &UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Generation>, RepositoryError> {
        let sql = format!(
            "SELECT {GENERATION_COLUMNS} FROM generations \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, GenerationRow>(&sql)
            .bind(user_id.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Generation::try_from)
            .collect()
    }

    async fn get(
        &self,
        user_id: &UserId,
        id: GenerationId,
    ) -> Result<Option<Generation>, RepositoryError> {
        let sql = format!(
            "SELECT {GENERATION_COLUMNS} FROM generations WHERE id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, GenerationRow>(&sql)
            .bind(id)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Generation::try_from)
            .transpose()
    }

    async fn update_output(
        &self,
        user_id: &UserId,
        id: GenerationId,
        output_text: &str,
    ) -> Result<Option<Generation>, RepositoryError> {
        let sql = format!(
            "UPDATE generations SET output_text = $3 \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {GENERATION_COLUMNS}"
        );
        sqlx::query_as::<_, GenerationRow>(&sql)
            .bind(id)
            .bind(user_id.as_str())
            .bind(output_text)
            .fetch_optional(&self.pool)
            .await?
            .map(Generation::try_from)
            .transpose()
    }

    async fn delete(&self, user_id: &UserId, id: GenerationId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM generations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
