//! Business logic services.
//!
//! # Services
//!
//! - [`generation`] - Entitlement check, description generation, credit debit
//! - [`billing`] - Webhook verification and billing reconciliation
//! - [`checkout`] - Subscription checkout sessions
//! - [`library`] - Generation history and saved listings
//!
//! Services borrow their stores and providers from `AppState` for the
//! duration of one request.

pub mod billing;
pub mod checkout;
pub mod generation;
pub mod library;

pub use billing::{BillingError, BillingOutcome, BillingService};
pub use checkout::{CheckoutError, CheckoutService};
pub use generation::{GenerationError, GenerationOutcome, GenerationService};
pub use library::{LibraryError, LibraryService, PageParams, SaveListing};
