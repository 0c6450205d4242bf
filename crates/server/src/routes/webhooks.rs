//! `POST /webhooks/billing`: payment-provider lifecycle events.
//!
//! The body is taken as raw bytes because the signature covers the exact
//! bytes sent.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde_json::{Value, json};

use crate::error::Result;
use crate::state::AppState;

/// Signature header set by Stripe.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub async fn billing(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state
        .billing_service()
        .handle_webhook(&body, signature)
        .await?;
    tracing::debug!(outcome = ?outcome, "Webhook acknowledged");

    Ok(Json(json!({ "received": true })))
}
