//! Free credits, subscriptions and the upgrade prompt.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use propscribe_core::{STARTING_CREDITS, SubscriptionStatus, UserId};
use propscribe_integration_tests::{ScriptedGenerator, TestClient, TestHarness};
use propscribe_server::db::ProfileStore;
use propscribe_server::services::generation::{CREDIT_UPDATE_WARNING, UPGRADE_PROMPT};

#[tokio::test]
async fn three_free_generations_then_upgrade_prompt() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;

    for expected in (0..STARTING_CREDITS).rev() {
        let response = client.generate().await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["creditsRemaining"], expected);
        assert!(response.body["generationId"].is_number());
    }

    let denied = client.generate().await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.body["error"], UPGRADE_PROMPT);

    // The denied request never reached the provider or the history
    assert_eq!(harness.generator.calls().await, 3);
    assert_eq!(harness.generations.all().await.len(), 3);

    let profile = client.get("/profile").await;
    assert_eq!(profile.body["creditsRemaining"], 0);
}

#[tokio::test]
async fn subscribers_generate_without_spending_credits() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;
    let user = UserId::parse("agent").unwrap();
    harness.profiles.seed(&user, 0, SubscriptionStatus::Active).await;

    for _ in 0..2 {
        let response = client.generate().await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.get("creditsRemaining").is_none());
    }

    let profile = harness.profiles.get(&user).await.unwrap().unwrap();
    assert_eq!(profile.credits_remaining, 0);
    assert_eq!(harness.generations.all().await.len(), 2);
}

#[tokio::test]
async fn provider_failure_costs_nothing() {
    let harness = TestHarness::with_generator(ScriptedGenerator::failing());
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;

    let response = client.generate().await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    let user = UserId::parse("agent").unwrap();
    let profile = harness.profiles.get(&user).await.unwrap().unwrap();
    assert_eq!(profile.credits_remaining, STARTING_CREDITS);
    assert!(harness.generations.all().await.is_empty());
}

#[tokio::test]
async fn failed_debit_still_delivers_the_description() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;
    harness.profiles.fail_debits(true);

    let response = client.generate().await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["description"].is_string());
    assert_eq!(response.body["warning"], CREDIT_UPDATE_WARNING);
    assert!(response.body.get("creditsRemaining").is_none());
}

#[tokio::test]
async fn canceled_subscription_falls_back_to_remaining_credits() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;
    let user = UserId::parse("agent").unwrap();
    harness.profiles.seed(&user, 1, SubscriptionStatus::Canceled).await;

    let first = client.generate().await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["creditsRemaining"], 0);

    let second = client.generate().await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);
}
