//! Smoke tests against a running server.
//!
//! These tests require a deployed or local server:
//!
//! ```bash
//! PROPSCRIBE_TEST_URL=http://localhost:3000 \
//!     cargo test -p propscribe-integration-tests --test live_smoke -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode, redirect::Policy};

fn base_url() -> String {
    std::env::var("PROPSCRIBE_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn health_endpoints_respond() {
    let client = client();

    let live = client.get(format!("{}/health", base_url())).send().await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    assert_eq!(live.text().await.unwrap(), "ok");

    let ready = client
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn protected_routes_reject_anonymous_requests() {
    let response = client()
        .get(format!("{}/profile", base_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn webhook_without_signature_is_rejected() {
    let response = client()
        .post(format!("{}/webhooks/billing", base_url()))
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
