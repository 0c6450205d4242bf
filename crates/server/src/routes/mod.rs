//! HTTP routes.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness
//! GET    /health/ready           - Readiness (database)
//!
//! # Generation (requires auth, rate limited)
//! POST   /generate               - Generate a description, debit a credit
//!
//! # Library (requires auth)
//! GET    /generations            - Generation history (?limit=&offset=)
//! GET    /generations/{id}       - One generation
//! PATCH  /generations/{id}       - Edit the generated text
//! DELETE /generations/{id}       - Delete a generation
//! POST   /listings               - Save a listing
//! GET    /listings               - Saved listings
//! GET    /listings/{id}          - One listing
//! PATCH  /listings/{id}          - Edit a listing description
//! DELETE /listings/{id}          - Delete a listing
//!
//! # Account (requires auth)
//! GET    /profile                - Credits and subscription status
//! GET    /checkout               - Open a subscription checkout
//!
//! # Billing
//! POST   /webhooks/billing       - Signed payment-provider events
//!
//! # Auth (rate limited)
//! GET    /auth/login             - Redirect to the identity provider
//! GET    /auth/callback          - Finish sign-in
//! POST   /auth/logout            - Clear the session
//! ```

pub mod auth;
pub mod checkout;
pub mod generate;
pub mod generations;
pub mod health;
pub mod listings;
pub mod profile;
pub mod webhooks;

use axum::{
    Json, Router,
    body::Body,
    http::Request,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::{
    auth_rate_limiter, generate_rate_limiter, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// `{success: true, data}` body used by the library routes.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
        })
    }

    pub fn success() -> Json<Self> {
        Json(Self {
            success: true,
            data: None,
        })
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

pub fn generation_routes() -> Router<AppState> {
    Router::new().route("/", get(generations::index)).route(
        "/{id}",
        get(generations::show)
            .patch(generations::update)
            .delete(generations::delete),
    )
}

pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(listings::index).post(listings::create))
        .route(
            "/{id}",
            get(listings::show)
                .patch(listings::update)
                .delete(listings::delete),
        )
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/generate",
            post(generate::generate).layer(generate_rate_limiter()),
        )
        .nest("/generations", generation_routes())
        .nest("/listings", listing_routes())
        .route("/profile", get(profile::show))
        .route("/checkout", get(checkout::start))
        .route("/webhooks/billing", post(webhooks::billing))
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
}

/// The complete application: health probes, routes, sessions, request ids,
/// security headers and request tracing.
///
/// Sentry layers are added by the binary on top of this.
pub fn app<S>(state: AppState, sessions: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .layer(sessions)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
