//! `POST /generate`.

use axum::{Json, extract::State, extract::rejection::JsonRejection};

use propscribe_core::PropertyDetails;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::GenerationOutcome;
use crate::state::AppState;

/// Generate a description for the signed-in user.
///
/// Responds with `{description, creditsRemaining?, warning?, generationId?}`.
pub async fn generate(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<PropertyDetails>, JsonRejection>,
) -> Result<Json<GenerationOutcome>> {
    let Json(details) = payload?;
    let outcome = state.generation_service().generate(&user.id, details).await?;
    Ok(Json(outcome))
}
