//! `GET /checkout`: open a hosted subscription checkout.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

pub async fn start(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutResponse>> {
    let url = state.checkout_service().start(&user.id).await?;
    Ok(Json(CheckoutResponse { url }))
}
