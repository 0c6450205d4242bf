//! Generation history: `/generations` and `/generations/{id}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
};
use serde::Deserialize;

use propscribe_core::GenerationId;

use super::Envelope;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Generation;
use crate::services::PageParams;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGeneration {
    pub output_text: String,
}

/// `GET /generations?limit=&offset=`
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: std::result::Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Generation>>>> {
    let Query(page) = page?;
    let generations = state
        .library_service()
        .list_generations(&user.id, page)
        .await?;
    Ok(Envelope::data(generations))
}

/// `GET /generations/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<GenerationId>, PathRejection>,
) -> Result<Json<Envelope<Generation>>> {
    let Path(id) = id?;
    let generation = state.library_service().get_generation(&user.id, id).await?;
    Ok(Envelope::data(generation))
}

/// `PATCH /generations/{id}` with `{outputText}`
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<GenerationId>, PathRejection>,
    payload: std::result::Result<Json<UpdateGeneration>, JsonRejection>,
) -> Result<Json<Envelope<Generation>>> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let generation = state
        .library_service()
        .update_generation(&user.id, id, &body.output_text)
        .await?;
    Ok(Envelope::data(generation))
}

/// `DELETE /generations/{id}`; succeeds even if nothing was removed.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<GenerationId>, PathRejection>,
) -> Result<Json<Envelope<()>>> {
    let Path(id) = id?;
    state
        .library_service()
        .delete_generation(&user.id, id)
        .await?;
    Ok(Envelope::success())
}
