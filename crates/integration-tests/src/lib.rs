//! Integration tests for Propscribe.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process scenarios (in-memory stores, stub providers)
//! cargo test -p propscribe-integration-tests
//!
//! # Smoke tests against a running server
//! PROPSCRIBE_TEST_URL=http://localhost:3000 \
//!     cargo test -p propscribe-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `billing_lifecycle` - Signed webhooks, replays, unknown customers
//! - `credit_exhaustion` - Free credits, subscriptions, upgrade prompt
//! - `library_ownership` - History and listings scoped to their owner
//! - `checkout_flow` - Customer creation and hosted checkout
//! - `live_smoke` - Health and auth checks against a deployed server

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::atomic::{AtomicU8, Ordering};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub use propscribe_server::testing::{
    REJECTED_CODE, STUB_CHECKOUT_URL, ScriptedGenerator, TestHarness, sample_details,
    sign_webhook,
};

static NEXT_CLIENT: AtomicU8 = AtomicU8::new(1);

/// A response reduced to what the scenarios assert on.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    /// Parsed JSON body, `Value::Null` when the body is empty or not JSON.
    pub body: Value,
}

/// A browser-like client: keeps its session cookie and its own client IP.
#[derive(Clone)]
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
    ip: String,
}

impl TestClient {
    /// A signed-out client of `app`.
    ///
    /// Clients of the same router share its session store and rate limiters;
    /// each gets a distinct IP so limits are not shared.
    #[must_use]
    pub fn new(app: &Router) -> Self {
        let n = NEXT_CLIENT.fetch_add(1, Ordering::Relaxed);
        Self {
            app: app.clone(),
            cookie: None,
            ip: format!("198.51.100.{n}"),
        }
    }

    /// A client of `app` already signed in as `user`.
    pub async fn signed_in(app: &Router, user: &str) -> Self {
        let mut client = Self::new(app);
        client.sign_in(user).await;
        client
    }

    /// Run the hosted sign-in round trip. The stub provider accepts any code
    /// as the user id.
    pub async fn sign_in(&mut self, user: &str) -> TestResponse {
        let login = self.get("/auth/login").await;
        assert_eq!(login.status, StatusCode::SEE_OTHER);
        self.get(&format!("/auth/callback?code={user}")).await
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send("GET", uri, None).await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn patch_json(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.send("PATCH", uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.send("DELETE", uri, None).await
    }

    /// Generate a description for [`sample_details`].
    pub async fn generate(&mut self) -> TestResponse {
        let body = serde_json::to_value(sample_details()).unwrap();
        self.post_json("/generate", &body).await
    }

    async fn send(&mut self, method: &str, uri: &str, body: Option<&Value>) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", &self.ip);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        if let Some(cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
        {
            self.cookie = Some(cookie.to_string());
        }
        into_test_response(response).await
    }
}

/// Deliver a billing webhook with an optional `Stripe-Signature` header.
pub async fn post_webhook(app: &Router, payload: &str, signature: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method("POST").uri("/webhooks/billing");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    let request = builder.body(Body::from(payload.to_owned())).unwrap();
    into_test_response(app.clone().oneshot(request).await.unwrap()).await
}

/// Deliver a webhook signed now with the test secret.
pub async fn post_signed_webhook(app: &Router, payload: &str) -> TestResponse {
    let signature = sign_webhook(payload, chrono::Utc::now().timestamp());
    post_webhook(app, payload, Some(&signature)).await
}

async fn into_test_response(response: axum::response::Response) -> TestResponse {
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse {
        status,
        location,
        body,
    }
}
