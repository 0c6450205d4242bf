//! Hosted checkout through to an active subscription.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use propscribe_core::{SubscriptionStatus, UserId};
use propscribe_integration_tests::{
    STUB_CHECKOUT_URL, TestClient, TestHarness, post_signed_webhook,
};
use propscribe_server::db::ProfileStore;
use serde_json::json;

#[tokio::test]
async fn checkout_then_webhook_grants_unlimited_generation() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;
    let user = UserId::parse("agent").unwrap();
    harness.profiles.seed(&user, 0, SubscriptionStatus::None).await;

    let checkout = client.get("/checkout").await;
    assert_eq!(checkout.status, StatusCode::OK);
    assert_eq!(checkout.body["url"], STUB_CHECKOUT_URL);

    let customer = harness
        .profiles
        .get(&user)
        .await
        .unwrap()
        .unwrap()
        .stripe_customer_id
        .unwrap();

    // Still not entitled until the provider confirms payment
    assert_eq!(client.generate().await.status, StatusCode::FORBIDDEN);

    let completed = json!({
        "id": "evt_checkout",
        "type": "checkout.session.completed",
        "data": { "object": {
            "customer": customer,
            "client_reference_id": "agent"
        }}
    })
    .to_string();
    assert_eq!(post_signed_webhook(&app, &completed).await.status, StatusCode::OK);

    let response = client.generate().await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.get("creditsRemaining").is_none());
}

#[tokio::test]
async fn repeated_checkout_reuses_the_customer() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;

    client.get("/checkout").await;
    client.get("/checkout").await;

    assert_eq!(harness.payments.customers().await.len(), 1);
    let sessions = harness.payments.sessions().await;
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().all(|s| s.customer_id == "cus_stub_1"));
    assert!(sessions.iter().all(|s| s.user_id.as_str() == "agent"));
}

#[tokio::test]
async fn checkout_requires_sign_in() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::new(&app);

    assert_eq!(client.get("/checkout").await.status, StatusCode::UNAUTHORIZED);
    assert!(harness.payments.customers().await.is_empty());
}
