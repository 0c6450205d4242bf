//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PROPSCRIBE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `PROPSCRIBE_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `PROPSCRIBE_BASE_URL` - Public URL of the service, used for OAuth and checkout redirects
//! - `PROPSCRIBE_HOST` - Bind address (default: 127.0.0.1)
//! - `PROPSCRIBE_PORT` - Listen port (default: 3000)
//! - `ANTHROPIC_API_KEY` - Text generation provider key
//! - `ANTHROPIC_MODEL` - Model ID (default: claude-sonnet-4-20250514)
//! - `ANTHROPIC_MAX_TOKENS` - Output token cap (default: 1024)
//! - `STRIPE_SECRET_KEY` - Stripe API key for customers and checkout sessions
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//! - `STRIPE_PRICE_ID` - Subscription price offered at checkout
//! - `IDENTITY_URL` - Identity provider base URL
//! - `IDENTITY_ANON_KEY` - Identity provider public API key
//! - `IDENTITY_OAUTH_PROVIDER` - External sign-in provider (default: google)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! Provider settings are optional at startup. A request that needs an
//! unconfigured provider fails with a "not configured" error instead.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 1024;
const DEFAULT_OAUTH_PROVIDER: &str = "google";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash; sign-in and checkout need it
    pub base_url: Option<String>,
    /// Session secret
    pub session_secret: SecretString,
    /// Text generation provider, if configured
    pub anthropic: Option<AnthropicConfig>,
    /// Payment provider settings
    pub stripe: StripeConfig,
    /// Identity provider, if configured
    pub identity: Option<IdentityConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Anthropic Messages API configuration.
#[derive(Clone)]
pub struct AnthropicConfig {
    pub api_key: SecretString,
    /// Model ID (e.g., claude-sonnet-4-20250514)
    pub model: String,
    pub max_tokens: u32,
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Stripe configuration.
///
/// Checkout needs the secret key and price; webhook verification needs only
/// the webhook secret, so each is optional on its own.
#[derive(Clone, Default)]
pub struct StripeConfig {
    pub secret_key: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
    pub price_id: Option<String>,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<SecretString>| s.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("StripeConfig")
            .field("secret_key", &redact(&self.secret_key))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("price_id", &self.price_id)
            .finish()
    }
}

/// Identity provider configuration (OAuth with PKCE).
#[derive(Clone)]
pub struct IdentityConfig {
    /// Base URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Public API key sent with every identity request
    pub anon_key: SecretString,
    /// External provider shown on the authorize page (e.g. "google")
    pub oauth_provider: String,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("oauth_provider", &self.oauth_provider)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("PROPSCRIBE_DATABASE_URL")?;
        let host = get_env_or_default("PROPSCRIBE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PROPSCRIBE_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("PROPSCRIBE_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PROPSCRIBE_PORT".to_string(), e.to_string())
            })?;
        let base_url = parse_base_url(get_optional_env("PROPSCRIBE_BASE_URL"))?;
        let session_secret = get_validated_secret("PROPSCRIBE_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "PROPSCRIBE_SESSION_SECRET")?;

        let anthropic = AnthropicConfig::from_env()?;
        let stripe = StripeConfig::from_env()?;
        let identity = IdentityConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            anthropic,
            stripe,
            identity,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url
            .as_deref()
            .is_some_and(|url| url.starts_with("https://"))
    }
}

impl AnthropicConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = get_optional_validated_secret("ANTHROPIC_API_KEY")? else {
            return Ok(None);
        };

        let max_tokens = get_env_or_default(
            "ANTHROPIC_MAX_TOKENS",
            &DEFAULT_ANTHROPIC_MAX_TOKENS.to_string(),
        )
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidEnvVar("ANTHROPIC_MAX_TOKENS".to_string(), e.to_string()))?;

        Ok(Some(Self {
            api_key,
            model: get_env_or_default("ANTHROPIC_MODEL", DEFAULT_ANTHROPIC_MODEL),
            max_tokens,
        }))
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: get_optional_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_optional_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            price_id: get_optional_env("STRIPE_PRICE_ID"),
        })
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(url) = get_optional_env("IDENTITY_URL") else {
            return Ok(None);
        };
        url::Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("IDENTITY_URL".to_string(), e.to_string()))?;

        // The anon key is a public client key, so only presence is checked.
        let anon_key = get_required_secret("IDENTITY_ANON_KEY")?;

        Ok(Some(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key,
            oauth_provider: get_env_or_default("IDENTITY_OAUTH_PROVIDER", DEFAULT_OAUTH_PROVIDER),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Validate an optional public base URL and strip its trailing slash.
fn parse_base_url(value: Option<String>) -> Result<Option<String>, ConfigError> {
    value
        .map(|value| {
            url::Url::parse(&value).map_err(|e| {
                ConfigError::InvalidEnvVar("PROPSCRIBE_BASE_URL".to_string(), e.to_string())
            })?;
            Ok(value.trim_end_matches('/').to_string())
        })
        .transpose()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a required secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Load an optional secret; when present it must pass validation.
fn get_optional_validated_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    get_optional_env(key)
        .map(|value| {
            validate_secret_strength(&value, key)?;
            Ok(SecretString::from(value))
        })
        .transpose()
}
