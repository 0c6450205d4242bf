//! Propscribe server library.
//!
//! The HTTP service as a library so the binary, the CLI and the
//! integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod anthropic;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
