//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (per-request hub, error capture)
//! 2. `TraceLayer` (request span)
//! 3. Security headers
//! 4. Request ID (correlation id on span, Sentry scope and response)
//! 5. Session layer (tower-sessions)
//! 6. Rate limiting (governor) on `/generate` and `/auth/*`

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAuth, clear_current_user, set_current_user};
pub use rate_limit::{auth_rate_limiter, generate_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{postgres_session_store, session_layer};
