//! Domain models for the server.
//!
//! These are validated domain objects, separate from database row types.

pub mod generation;
pub mod listing;
pub mod profile;
pub mod session;

pub use generation::Generation;
pub use listing::{Listing, NewListing};
pub use profile::{DebitOutcome, Profile, ProfileSummary};
pub use session::{CurrentUser, keys as session_keys};
