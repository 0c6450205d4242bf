//! Billing webhooks end to end: signature checks, replays, status mapping.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use propscribe_core::{SubscriptionStatus, UserId};
use propscribe_integration_tests::{TestClient, TestHarness, post_signed_webhook, post_webhook};
use propscribe_server::db::ProfileStore;
use propscribe_server::models::Profile;
use serde_json::json;

fn checkout_completed(event_id: &str, user: &str, customer: &str) -> String {
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_test_1",
            "customer": customer,
            "client_reference_id": user,
            "metadata": { "supabaseUserId": user }
        }}
    })
    .to_string()
}

fn subscription_event(event_type: &str, customer: &str, status: &str) -> String {
    json!({
        "id": format!("evt_{event_type}_{status}"),
        "type": event_type,
        "data": { "object": {
            "id": "sub_1",
            "customer": customer,
            "status": status
        }}
    })
    .to_string()
}

async fn profile(harness: &TestHarness, user: &str) -> Profile {
    harness
        .profiles
        .get(&UserId::parse(user).unwrap())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn checkout_completion_activates_and_links_customer() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "u1").await;

    let response = post_signed_webhook(&app, &checkout_completed("evt_1", "u1", "cus_1")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "received": true }));

    let profile = profile(&harness, "u1").await;
    assert_eq!(profile.subscription_status, SubscriptionStatus::Active);
    assert_eq!(profile.stripe_customer_id.as_deref(), Some("cus_1"));

    let summary = client.get("/profile").await;
    assert_eq!(summary.body["subscriptionStatus"], "active");
    assert_eq!(summary.body["hasBillingCustomer"], true);
}

#[tokio::test]
async fn replayed_event_has_the_same_effect_as_one_delivery() {
    let harness = TestHarness::new();
    let app = harness.router();
    TestClient::signed_in(&app, "u1").await;
    let payload = checkout_completed("evt_1", "u1", "cus_1");

    post_signed_webhook(&app, &payload).await;
    let once = profile(&harness, "u1").await;

    let replay = post_signed_webhook(&app, &payload).await;
    assert_eq!(replay.status, StatusCode::OK);
    let twice = profile(&harness, "u1").await;

    assert_eq!(once.billing_state(), twice.billing_state());
    assert_eq!(once.credits_remaining, twice.credits_remaining);
}

#[tokio::test]
async fn subscription_updates_follow_provider_status() {
    let harness = TestHarness::new();
    let app = harness.router();
    TestClient::signed_in(&app, "u1").await;
    post_signed_webhook(&app, &checkout_completed("evt_1", "u1", "cus_1")).await;

    let updated = "customer.subscription.updated";
    post_signed_webhook(&app, &subscription_event(updated, "cus_1", "past_due")).await;
    assert_eq!(
        profile(&harness, "u1").await.subscription_status,
        SubscriptionStatus::Canceled
    );

    post_signed_webhook(&app, &subscription_event(updated, "cus_1", "trialing")).await;
    assert_eq!(
        profile(&harness, "u1").await.subscription_status,
        SubscriptionStatus::Active
    );

    let deleted = "customer.subscription.deleted";
    post_signed_webhook(&app, &subscription_event(deleted, "cus_1", "canceled")).await;
    let profile = profile(&harness, "u1").await;
    assert_eq!(profile.subscription_status, SubscriptionStatus::Canceled);
    assert_eq!(profile.stripe_customer_id.as_deref(), Some("cus_1"));
}

#[tokio::test]
async fn unknown_customer_is_acknowledged_without_changes() {
    let harness = TestHarness::new();
    let app = harness.router();
    TestClient::signed_in(&app, "u1").await;
    let before = profile(&harness, "u1").await;

    let response = post_signed_webhook(
        &app,
        &subscription_event("customer.subscription.deleted", "cus_nobody", "canceled"),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(profile(&harness, "u1").await, before);
}

#[tokio::test]
async fn unhandled_event_types_are_acknowledged() {
    let harness = TestHarness::new();
    let app = harness.router();

    let payload = json!({
        "id": "evt_inv",
        "type": "invoice.paid",
        "data": { "object": { "customer": "cus_1" } }
    })
    .to_string();
    let response = post_signed_webhook(&app, &payload).await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn bad_signatures_are_rejected_without_mutation() {
    let harness = TestHarness::new();
    let app = harness.router();
    TestClient::signed_in(&app, "u1").await;
    let payload = checkout_completed("evt_1", "u1", "cus_1");
    let now = chrono::Utc::now().timestamp();

    let forged = propscribe_integration_tests::sign_webhook("{}", now);
    let stale = propscribe_integration_tests::sign_webhook(&payload, now - 3600);

    for signature in [None, Some("garbage"), Some(forged.as_str()), Some(stale.as_str())] {
        let response = post_webhook(&app, &payload, signature).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{signature:?}");
        assert!(response.body["error"].is_string());
    }

    let profile = profile(&harness, "u1").await;
    assert_eq!(profile.subscription_status, SubscriptionStatus::None);
    assert!(profile.stripe_customer_id.is_none());
}

#[tokio::test]
async fn signed_but_malformed_payload_is_a_client_error() {
    let harness = TestHarness::new();
    let app = harness.router();

    let response = post_signed_webhook(&app, "not json").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
