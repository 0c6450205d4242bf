//! Saved listings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use propscribe_core::{ListingId, PropertyDetails, UserId};

/// A listing explicitly saved by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub user_id: UserId,
    /// Derived at creation as "{propertyType} in {location}".
    pub title: String,
    pub description: String,
    pub details: PropertyDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a listing.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub details: PropertyDetails,
}
