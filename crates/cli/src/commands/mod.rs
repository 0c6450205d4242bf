//! CLI command implementations.

pub mod migrate;
pub mod profile;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connection string variable shared with the server.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Errors common to every command that needs the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load `.env` and connect with the server's pool settings.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var(DATABASE_URL_VAR)
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar(DATABASE_URL_VAR))?;

    tracing::info!("Connecting to database...");
    Ok(propscribe_server::db::create_pool(&database_url).await?)
}
