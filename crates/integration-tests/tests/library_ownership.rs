//! History and saved listings are visible only to their owner.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use propscribe_integration_tests::{TestClient, TestHarness, sample_details};
use serde_json::json;

#[tokio::test]
async fn generation_history_is_owner_scoped() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut owner = TestClient::signed_in(&app, "owner").await;
    let mut other = TestClient::signed_in(&app, "other").await;

    let generated = owner.generate().await;
    let id = generated.body["generationId"].as_i64().unwrap();
    let uri = format!("/generations/{id}");

    let listing = other.get("/generations").await;
    assert_eq!(listing.body, json!({ "success": true, "data": [] }));
    assert_eq!(other.get(&uri).await.status, StatusCode::NOT_FOUND);

    let foreign_edit = other
        .patch_json(&uri, &json!({ "outputText": "Hijacked" }))
        .await;
    assert_eq!(foreign_edit.status, StatusCode::NOT_FOUND);

    // Deleting another user's record reports success but affects nothing
    let foreign_delete = other.delete(&uri).await;
    assert_eq!(foreign_delete.status, StatusCode::OK);
    assert_eq!(harness.generations.all().await.len(), 1);

    let edited = owner
        .patch_json(&uri, &json!({ "outputText": "Edited by the agent." }))
        .await;
    assert_eq!(edited.body["data"]["outputText"], "Edited by the agent.");

    assert_eq!(owner.delete(&uri).await.status, StatusCode::OK);
    assert!(harness.generations.all().await.is_empty());
}

#[tokio::test]
async fn history_paging() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;
    client.generate().await;
    client.generate().await;

    let first_page = client.get("/generations?limit=1").await;
    assert_eq!(first_page.body["data"].as_array().unwrap().len(), 1);

    let second_page = client.get("/generations?limit=1&offset=1").await;
    assert_eq!(second_page.body["data"].as_array().unwrap().len(), 1);
    assert_ne!(
        first_page.body["data"][0]["id"],
        second_page.body["data"][0]["id"]
    );

    for bad in ["/generations?limit=0", "/generations?limit=101", "/generations?offset=-1"] {
        assert_eq!(client.get(bad).await.status, StatusCode::BAD_REQUEST, "{bad}");
    }
}

#[tokio::test]
async fn generation_does_not_save_a_listing() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut client = TestClient::signed_in(&app, "agent").await;

    client.generate().await;

    let listings = client.get("/listings").await;
    assert_eq!(listings.body, json!({ "success": true, "data": [] }));
    assert!(harness.listings.all().await.is_empty());
}

#[tokio::test]
async fn saved_listings_are_owner_scoped() {
    let harness = TestHarness::new();
    let app = harness.router();
    let mut owner = TestClient::signed_in(&app, "owner").await;
    let mut other = TestClient::signed_in(&app, "other").await;

    let mut body = serde_json::to_value(sample_details()).unwrap();
    body["description"] = json!("Riverside apartment with a sunny balcony.");
    let saved = owner.post_json("/listings", &body).await;
    assert_eq!(saved.status, StatusCode::OK);
    let id = saved.body["data"]["id"].as_i64().unwrap();
    let uri = format!("/listings/{id}");

    assert_eq!(owner.get("/listings").await.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(other.get("/listings").await.body["data"], json!([]));
    assert_eq!(other.get(&uri).await.status, StatusCode::NOT_FOUND);

    assert_eq!(other.delete(&uri).await.status, StatusCode::OK);
    assert_eq!(harness.listings.all().await.len(), 1);

    let empty_edit = owner.patch_json(&uri, &json!({ "description": "  " })).await;
    assert_eq!(empty_edit.status, StatusCode::BAD_REQUEST);
}
