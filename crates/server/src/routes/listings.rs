//! Saved listings: `/listings` and `/listings/{id}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
};
use serde::Deserialize;

use propscribe_core::ListingId;

use super::Envelope;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Listing;
use crate::services::SaveListing;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateListing {
    pub description: String,
}

/// `POST /listings` with the description and the property fields
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<SaveListing>, JsonRejection>,
) -> Result<Json<Envelope<Listing>>> {
    let Json(request) = payload?;
    let listing = state
        .library_service()
        .create_listing(&user.id, request)
        .await?;
    Ok(Envelope::data(listing))
}

/// `GET /listings`
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Envelope<Vec<Listing>>>> {
    let listings = state.library_service().list_listings(&user.id).await?;
    Ok(Envelope::data(listings))
}

/// `GET /listings/{id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<ListingId>, PathRejection>,
) -> Result<Json<Envelope<Listing>>> {
    let Path(id) = id?;
    let listing = state.library_service().get_listing(&user.id, id).await?;
    Ok(Envelope::data(listing))
}

/// `PATCH /listings/{id}` with `{description}`
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<ListingId>, PathRejection>,
    payload: std::result::Result<Json<UpdateListing>, JsonRejection>,
) -> Result<Json<Envelope<Listing>>> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let listing = state
        .library_service()
        .update_listing(&user.id, id, &body.description)
        .await?;
    Ok(Envelope::data(listing))
}

/// `DELETE /listings/{id}`; succeeds even if nothing was removed.
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    id: std::result::Result<Path<ListingId>, PathRejection>,
) -> Result<Json<Envelope<()>>> {
    let Path(id) = id?;
    state.library_service().delete_listing(&user.id, id).await?;
    Ok(Envelope::success())
}
