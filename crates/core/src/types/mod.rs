//! Core types for Propscribe.
//!
//! This module provides type-safe wrappers for the domain concepts shared by
//! the server and the CLI.

pub mod billing;
pub mod entitlement;
pub mod id;
pub mod property;
pub mod status;

pub use billing::{BillingEvent, BillingState, BillingTarget, BillingTransition, reconcile};
pub use entitlement::{Entitlement, STARTING_CREDITS};
pub use id::*;
pub use property::{MAX_FIELD_CHARS, MAX_ROOMS, PropertyDetails, PropertyDetailsError};
pub use status::*;
