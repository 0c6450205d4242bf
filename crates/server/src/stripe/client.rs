//! Stripe REST client (form-encoded requests, bearer auth).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use propscribe_core::UserId;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::PaymentProvider;
use super::error::{ApiErrorResponse, StripeError};

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    inner: Arc<StripeClientInner>,
}

struct StripeClientInner {
    client: reqwest::Client,
    price_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
    url: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client selling the given subscription price.
    ///
    /// # Errors
    ///
    /// Returns an error if the key contains invalid header characters or the
    /// HTTP client cannot be built.
    pub fn new(secret_key: &SecretString, price_id: impl Into<String>) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", secret_key.expose_secret()))
            .map_err(|_| StripeError::InvalidKey)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(StripeClientInner {
                client,
                price_id: price_id.into(),
            }),
        })
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, StripeError> {
        let url = format!("{STRIPE_API_URL}{path}");
        let response = self.inner.client.post(&url).form(params).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(parse_api_error(&body));
        }

        serde_json::from_str(&body)
            .map_err(|e| StripeError::Parse(format!("Failed to parse {path} response: {e}")))
    }
}

fn parse_api_error(body: &str) -> StripeError {
    serde_json::from_str::<ApiErrorResponse>(body).map_or_else(
        |_| StripeError::Api {
            error_type: "unknown".to_string(),
            message: body.to_string(),
        },
        |e| StripeError::Api {
            error_type: e.error.error_type,
            message: e.error.message,
        },
    )
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, email), fields(user_id = %user_id))]
    async fn create_customer(
        &self,
        email: Option<&str>,
        user_id: &UserId,
    ) -> Result<String, StripeError> {
        let mut params = vec![("metadata[supabaseUserId]", user_id.as_str())];
        if let Some(email) = email {
            params.push(("email", email));
        }

        let customer: CreatedObject = self.post_form("/customers", &params).await?;
        tracing::info!(customer_id = %customer.id, "Stripe customer created");
        Ok(customer.id)
    }

    #[instrument(skip(self, success_url, cancel_url), fields(user_id = %user_id))]
    async fn create_checkout_session(
        &self,
        customer_id: &str,
        user_id: &UserId,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, StripeError> {
        let params = [
            ("mode", "subscription"),
            ("customer", customer_id),
            ("line_items[0][price]", self.inner.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("client_reference_id", user_id.as_str()),
            ("metadata[supabaseUserId]", user_id.as_str()),
        ];

        let session: CheckoutSession = self.post_form("/checkout/sessions", &params).await?;
        tracing::info!(session_id = %session.id, "Checkout session created");
        session
            .url
            .ok_or_else(|| StripeError::Parse("checkout session has no url".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_error_json() {
        let err = parse_api_error(r#"{"error":{"type":"card_error","message":"Declined"}}"#);
        assert!(matches!(
            err,
            StripeError::Api { ref error_type, ref message }
                if error_type == "card_error" && message == "Declined"
        ));
    }

    #[test]
    fn test_parse_api_error_plain_body() {
        let err = parse_api_error("Bad Gateway");
        assert!(matches!(err, StripeError::Api { ref message, .. } if message == "Bad Gateway"));
    }

    #[test]
    fn test_new_rejects_unprintable_key() {
        let key = SecretString::from("sk_test\n123".to_string());
        assert!(matches!(
            StripeClient::new(&key, "price_1"),
            Err(StripeError::InvalidKey)
        ));
    }
}
