//! Client for a Supabase-compatible auth service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use propscribe_core::UserId;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::IdentityConfig;

use super::error::IdentityError;
use super::{IdentityProvider, IdentityUser};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Identity provider client.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    base_url: String,
    oauth_provider: String,
}

#[derive(Debug, Serialize)]
struct PkceTokenRequest<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error_description", alias = "msg")]
    message: Option<String>,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key contains invalid header characters or
    /// the HTTP client cannot be built.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(config.anon_key.expose_secret())
            .map_err(|_| IdentityError::InvalidKey)?;
        key.set_sensitive(true);
        headers.insert("apikey", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                base_url: config.url.trim_end_matches('/').to_string(),
                oauth_provider: config.oauth_provider.clone(),
            }),
        })
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    fn authorize_url(
        &self,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<String, IdentityError> {
        let url = url::Url::parse_with_params(
            &format!("{}/auth/v1/authorize", self.inner.base_url),
            &[
                ("provider", self.inner.oauth_provider.as_str()),
                ("redirect_to", redirect_to),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "s256"),
            ],
        )
        .map_err(|e| IdentityError::Parse(e.to_string()))?;

        Ok(url.into())
    }

    #[instrument(skip_all)]
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<IdentityUser, IdentityError> {
        let url = format!("{}/auth/v1/token?grant_type=pkce", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .json(&PkceTokenRequest {
                auth_code: code,
                code_verifier,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| IdentityError::Parse(format!("Failed to parse token response: {e}")))?;

        let id = UserId::parse(&token.user.id)
            .map_err(|e| IdentityError::InvalidUser(e.to_string()))?;

        tracing::debug!(user_id = %id, "Identity code exchanged");

        Ok(IdentityUser {
            id,
            email: token.user.email,
        })
    }
}
