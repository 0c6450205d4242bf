//! Claude API client for description generation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::config::AnthropicConfig;

use super::TextGenerator;
use super::error::{ApiErrorResponse, ClaudeError};
use super::types::{ChatRequest, ChatResponse, Message};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    inner: Arc<ClaudeClientInner>,
}

struct ClaudeClientInner {
    client: reqwest::Client,
    model: String,
    max_tokens: u32,
}

impl ClaudeClient {
    /// Create a new Claude client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key contains invalid header characters or
    /// the HTTP client cannot be built.
    pub fn new(config: &AnthropicConfig) -> Result<Self, ClaudeError> {
        let api_key = config.api_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key_header =
            HeaderValue::from_str(api_key).map_err(|_| ClaudeError::InvalidApiKey)?;
        key_header.set_sensitive(true);
        headers.insert("x-api-key", key_header);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ClaudeClientInner {
                client,
                model: config.model.clone(),
                max_tokens: config.max_tokens,
            }),
        })
    }

    /// Send a chat request and get a complete response.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns an error response.
    #[instrument(skip(self, messages, system), fields(model = %self.inner.model))]
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
    ) -> Result<ChatResponse, ClaudeError> {
        let request = ChatRequest {
            model: self.inner.model.clone(),
            max_tokens: self.inner.max_tokens,
            messages,
            system,
        };

        let response = self
            .inner
            .client
            .post(ANTHROPIC_API_URL)
            .json(&request)
            .send()
            .await?;

        let chat = Self::handle_response(response).await?;
        tracing::debug!(
            input_tokens = chat.usage.input_tokens,
            output_tokens = chat.usage.output_tokens,
            stop_reason = ?chat.stop_reason,
            "Claude response received"
        );
        Ok(chat)
    }

    /// Handle a response, parsing the body or mapping the error status.
    async fn handle_response(response: reqwest::Response) -> Result<ChatResponse, ClaudeError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|e| ClaudeError::Parse(format!("Failed to parse response: {e}")))
        } else {
            Err(Self::handle_error_status(status, response).await)
        }
    }

    /// Handle an error status code.
    async fn handle_error_status(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ClaudeError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ClaudeError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return ClaudeError::Unauthorized("Invalid API key".to_string());
        }

        match response.text().await {
            Ok(body) => parse_api_error(&body),
            Err(e) => ClaudeError::Http(e),
        }
    }
}

/// Map an error body to `ClaudeError::Api`, keeping the raw body if it is not JSON.
fn parse_api_error(body: &str) -> ClaudeError {
    serde_json::from_str::<ApiErrorResponse>(body).map_or_else(
        |_| ClaudeError::Api {
            error_type: "unknown".to_string(),
            message: body.to_string(),
        },
        |api_error| ClaudeError::Api {
            error_type: api_error.error.error_type,
            message: api_error.error.message,
        },
    )
}

#[async_trait]
impl TextGenerator for ClaudeClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ClaudeError> {
        let response = self
            .chat(vec![Message::user(prompt)], Some(system.to_string()))
            .await?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(ClaudeError::EmptyResponse);
        }
        Ok(text)
    }
}
