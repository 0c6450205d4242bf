//! Generation history and saved listings.
//!
//! Ownership is enforced by the stores: every lookup carries the caller, so
//! another user's record is indistinguishable from a missing one.

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use propscribe_core::{GenerationId, ListingId, PropertyDetails, PropertyDetailsError, UserId};

use crate::db::{GenerationStore, ListingStore, RepositoryError};
use crate::models::{Generation, Listing, NewListing};

/// Maximum characters of a stored description.
pub const MAX_TEXT_CHARS: usize = 20_000;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Errors from history and listing operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("invalid property details: {0}")]
    InvalidDetails(#[from] PropertyDetailsError),

    /// Missing, or owned by someone else.
    #[error("not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// `?limit=&offset=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// Resolve to `(limit, offset)`, applying the default page size.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidInput` if `limit` is outside `1..=100`
    /// or `offset` is negative.
    pub fn resolve(self) -> Result<(i64, i64), LibraryError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(LibraryError::InvalidInput(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(LibraryError::InvalidInput(
                "offset must not be negative".to_string(),
            ));
        }
        Ok((limit, offset))
    }
}

/// Body of a "save listing" request: the description next to the property
/// fields it was generated from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveListing {
    pub description: String,
    #[serde(flatten)]
    pub property_details: PropertyDetails,
}

/// Trim and bound a description, rejecting empty text.
fn clean_text(text: &str, field: &str) -> Result<String, LibraryError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LibraryError::InvalidInput(format!("{field} is required")));
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(LibraryError::InvalidInput(format!(
            "{field} must be at most {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(text.to_string())
}

/// History and listing service.
pub struct LibraryService<'a> {
    generations: &'a dyn GenerationStore,
    listings: &'a dyn ListingStore,
}

impl<'a> LibraryService<'a> {
    #[must_use]
    pub const fn new(generations: &'a dyn GenerationStore, listings: &'a dyn ListingStore) -> Self {
        Self {
            generations,
            listings,
        }
    }

    // =========================================================================
    // Generations
    // =========================================================================

    /// The caller's generations, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidInput` for out-of-range paging.
    pub async fn list_generations(
        &self,
        user_id: &UserId,
        page: PageParams,
    ) -> Result<Vec<Generation>, LibraryError> {
        let (limit, offset) = page.resolve()?;
        Ok(self.generations.list(user_id, limit, offset).await?)
    }

    /// # Errors
    ///
    /// Returns `LibraryError::NotFound` if the caller has no such generation.
    pub async fn get_generation(
        &self,
        user_id: &UserId,
        id: GenerationId,
    ) -> Result<Generation, LibraryError> {
        self.generations
            .get(user_id, id)
            .await?
            .ok_or(LibraryError::NotFound)
    }

    /// Replace a generation's output text.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidInput` for empty or oversized text and
    /// `LibraryError::NotFound` if the caller has no such generation.
    #[instrument(skip(self, output_text), fields(user_id = %user_id, generation_id = %id))]
    pub async fn update_generation(
        &self,
        user_id: &UserId,
        id: GenerationId,
        output_text: &str,
    ) -> Result<Generation, LibraryError> {
        let text = clean_text(output_text, "outputText")?;
        self.generations
            .update_output(user_id, id, &text)
            .await?
            .ok_or(LibraryError::NotFound)
    }

    /// Delete a generation. Missing or foreign records are a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    #[instrument(skip(self), fields(user_id = %user_id, generation_id = %id))]
    pub async fn delete_generation(
        &self,
        user_id: &UserId,
        id: GenerationId,
    ) -> Result<(), LibraryError> {
        let removed = self.generations.delete(user_id, id).await?;
        tracing::debug!(removed, "Generation delete");
        Ok(())
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Save a listing; the title is derived from the property details.
    ///
    /// # Errors
    ///
    /// Returns an error if the description or details fail validation.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_listing(
        &self,
        user_id: &UserId,
        request: SaveListing,
    ) -> Result<Listing, LibraryError> {
        let description = clean_text(&request.description, "description")?;
        let details = request.property_details.normalized()?;
        let listing = NewListing {
            title: details.listing_title(),
            description,
            details,
        };

        let listing = self.listings.insert(user_id, &listing).await?;
        tracing::info!(listing_id = %listing.id, "Listing saved");
        Ok(listing)
    }

    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn list_listings(&self, user_id: &UserId) -> Result<Vec<Listing>, LibraryError> {
        Ok(self.listings.list(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `LibraryError::NotFound` if the caller has no such listing.
    pub async fn get_listing(&self, user_id: &UserId, id: ListingId) -> Result<Listing, LibraryError> {
        self.listings
            .get(user_id, id)
            .await?
            .ok_or(LibraryError::NotFound)
    }

    /// Replace a listing's description.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidInput` for empty or oversized text and
    /// `LibraryError::NotFound` if the caller has no such listing.
    pub async fn update_listing(
        &self,
        user_id: &UserId,
        id: ListingId,
        description: &str,
    ) -> Result<Listing, LibraryError> {
        let text = clean_text(description, "description")?;
        self.listings
            .update_description(user_id, id, &text)
            .await?
            .ok_or(LibraryError::NotFound)
    }

    /// Delete a listing. Missing or foreign records are a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store fails.
    pub async fn delete_listing(&self, user_id: &UserId, id: ListingId) -> Result<(), LibraryError> {
        let removed = self.listings.delete(user_id, id).await?;
        tracing::debug!(removed, listing_id = %id, "Listing delete");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryGenerationStore, MemoryListingStore};
    use crate::testing::sample_details;

    struct Fixture {
        generations: MemoryGenerationStore,
        listings: MemoryListingStore,
        alice: UserId,
        bob: UserId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                generations: MemoryGenerationStore::new(),
                listings: MemoryListingStore::new(),
                alice: UserId::parse("alice").unwrap(),
                bob: UserId::parse("bob").unwrap(),
            }
        }

        fn service(&self) -> LibraryService<'_> {
            LibraryService::new(&self.generations, &self.listings)
        }
    }

    fn save(description: &str) -> SaveListing {
        SaveListing {
            description: description.to_string(),
            property_details: sample_details(),
        }
    }

    #[test]
    fn test_save_listing_reads_flat_body() {
        let mut body = serde_json::to_value(sample_details()).unwrap();
        body["description"] = serde_json::json!("Bright flat near the river.");

        let request: SaveListing = serde_json::from_value(body).unwrap();

        assert_eq!(request.description, "Bright flat near the river.");
        assert_eq!(request.property_details, sample_details());
    }

    #[test]
    fn test_page_params() {
        assert_eq!(PageParams::default().resolve().unwrap(), (20, 0));
        let page = PageParams {
            limit: Some(100),
            offset: Some(40),
        };
        assert_eq!(page.resolve().unwrap(), (100, 40));

        for (limit, offset) in [(Some(0), None), (Some(101), None), (None, Some(-1))] {
            let page = PageParams { limit, offset };
            assert!(matches!(page.resolve(), Err(LibraryError::InvalidInput(_))));
        }
    }

    #[tokio::test]
    async fn test_create_listing_derives_title() {
        let f = Fixture::new();

        let listing = f
            .service()
            .create_listing(&f.alice, save("  Sunny flat.  "))
            .await
            .unwrap();

        assert_eq!(listing.title, "Apartment in Lisbon");
        assert_eq!(listing.description, "Sunny flat.");
        assert_eq!(listing.user_id, f.alice);
    }

    #[tokio::test]
    async fn test_create_listing_rejects_blank_description() {
        let f = Fixture::new();
        let err = f.service().create_listing(&f.alice, save("   ")).await;
        assert!(matches!(err, Err(LibraryError::InvalidInput(_))));
        assert!(f.listings.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_listing_is_invisible_to_other_users() {
        let f = Fixture::new();
        let service = f.service();
        let listing = service.create_listing(&f.alice, save("Mine.")).await.unwrap();

        assert!(matches!(
            service.get_listing(&f.bob, listing.id).await,
            Err(LibraryError::NotFound)
        ));
        assert!(matches!(
            service.update_listing(&f.bob, listing.id, "Stolen.").await,
            Err(LibraryError::NotFound)
        ));
        assert!(service.list_listings(&f.bob).await.unwrap().is_empty());

        service.delete_listing(&f.bob, listing.id).await.unwrap();
        assert_eq!(
            service.get_listing(&f.alice, listing.id).await.unwrap().description,
            "Mine."
        );
    }

    #[tokio::test]
    async fn test_owner_can_edit_and_delete_listing() {
        let f = Fixture::new();
        let service = f.service();
        let listing = service.create_listing(&f.alice, save("Draft.")).await.unwrap();

        let updated = service
            .update_listing(&f.alice, listing.id, "Final copy.")
            .await
            .unwrap();
        assert_eq!(updated.description, "Final copy.");
        assert_eq!(updated.title, listing.title);

        service.delete_listing(&f.alice, listing.id).await.unwrap();
        assert!(matches!(
            service.get_listing(&f.alice, listing.id).await,
            Err(LibraryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_generation_history_is_owner_scoped() {
        let f = Fixture::new();
        let details = sample_details();
        let first = f
            .generations
            .insert(&f.alice, &details, "First.")
            .await
            .unwrap();
        f.generations
            .insert(&f.alice, &details, "Second.")
            .await
            .unwrap();
        f.generations
            .insert(&f.bob, &details, "Bob's.")
            .await
            .unwrap();
        let service = f.service();

        let mine = service
            .list_generations(&f.alice, PageParams::default())
            .await
            .unwrap();
        let texts: Vec<_> = mine.iter().map(|g| g.output_text.as_str()).collect();
        assert_eq!(texts, ["Second.", "First."]);

        service.delete_generation(&f.bob, first.id).await.unwrap();
        assert_eq!(f.generations.all().await.len(), 3);

        let edited = service
            .update_generation(&f.alice, first.id, "First, edited.")
            .await
            .unwrap();
        assert_eq!(edited.output_text, "First, edited.");
        assert!(matches!(
            service.update_generation(&f.bob, first.id, "x").await,
            Err(LibraryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_generation_rejects_oversized_text() {
        let f = Fixture::new();
        let generation = f
            .generations
            .insert(&f.alice, &sample_details(), "Short.")
            .await
            .unwrap();

        let huge = "a".repeat(MAX_TEXT_CHARS + 1);
        let err = f
            .service()
            .update_generation(&f.alice, generation.id, &huge)
            .await;

        assert!(matches!(err, Err(LibraryError::InvalidInput(_))));
    }
}
