//! `GET /profile`.

use axum::{Json, extract::State};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::ProfileSummary;
use crate::state::AppState;

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileSummary>> {
    let profile = state
        .profiles()
        .get(&user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;
    Ok(Json(ProfileSummary::from(&profile)))
}
