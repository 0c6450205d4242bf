//! Propscribe Core - Shared domain types.
//!
//! This crate provides the types used across all Propscribe components:
//! - `server` - HTTP service (generation, billing webhooks, history)
//! - `cli` - Command-line tools for migrations and profile administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision logic - no I/O, no
//! database access, no HTTP clients. The entitlement rule and the billing
//! reconciliation transitions live here so they can be tested without any
//! external service.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, subscription status, property details,
//!   entitlement and billing transitions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
