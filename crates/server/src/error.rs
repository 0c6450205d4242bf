//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding. All route handlers return `Result<T, AppError>`; the
//! body is always `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{BillingError, CheckoutError, GenerationError, LibraryError};
use crate::services::generation::UPGRADE_PROMPT;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status and client-safe message.
    ///
    /// Storage details are never echoed; provider failures get a short summary.
    fn status_and_message(&self) -> (StatusCode, String) {
        use StatusCode as S;

        let internal = || (S::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string());

        match self {
            Self::Database(_) => internal(),
            Self::NotFound(what) => (S::NOT_FOUND, format!("{what} not found")),
            Self::BadRequest(msg) => (S::BAD_REQUEST, msg.clone()),

            Self::Generation(err) => match err {
                GenerationError::InvalidInput(e) => (S::BAD_REQUEST, e.to_string()),
                GenerationError::ProfileNotFound => (S::NOT_FOUND, "Profile not found".to_string()),
                GenerationError::InsufficientEntitlement => {
                    (S::FORBIDDEN, UPGRADE_PROMPT.to_string())
                }
                GenerationError::NotConfigured => (
                    S::INTERNAL_SERVER_ERROR,
                    "Text generation is not configured".to_string(),
                ),
                GenerationError::Provider(e) => (S::BAD_GATEWAY, e.summary().to_string()),
                GenerationError::Repository(_) => internal(),
            },

            Self::Billing(err) => match err {
                BillingError::InvalidSignature(_) => {
                    (S::BAD_REQUEST, "Invalid signature".to_string())
                }
                BillingError::MalformedPayload(_) => {
                    (S::BAD_REQUEST, "Malformed event payload".to_string())
                }
                BillingError::NotConfigured => (
                    S::INTERNAL_SERVER_ERROR,
                    "Billing webhooks are not configured".to_string(),
                ),
            },

            Self::Checkout(err) => match err {
                CheckoutError::ProfileNotFound => (S::NOT_FOUND, "Profile not found".to_string()),
                CheckoutError::NotConfigured => (
                    S::INTERNAL_SERVER_ERROR,
                    "Payments are not configured".to_string(),
                ),
                CheckoutError::Provider(_) => {
                    (S::BAD_GATEWAY, "Payment provider error".to_string())
                }
                CheckoutError::Repository(_) => internal(),
            },

            Self::Library(err) => match err {
                LibraryError::InvalidInput(msg) => (S::BAD_REQUEST, msg.clone()),
                LibraryError::InvalidDetails(e) => (S::BAD_REQUEST, e.to_string()),
                LibraryError::NotFound => (S::NOT_FOUND, "Not found".to_string()),
                LibraryError::Repository(_) => internal(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// Extractor rejections become `{"error"}` bodies like every other failure.

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::anthropic::ClaudeError;
    use crate::stripe::WebhookError;

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status(GenerationError::InsufficientEntitlement.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(GenerationError::ProfileNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(GenerationError::Provider(ClaudeError::EmptyResponse).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(GenerationError::NotConfigured.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(BillingError::InvalidSignature(WebhookError::SignatureMismatch).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(LibraryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(CheckoutError::NotConfigured.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_storage_details_are_hidden() {
        let err = AppError::from(RepositoryError::DataCorruption(
            "profiles.user_id = ''".to_string(),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": INTERNAL_MESSAGE }));
    }

    #[tokio::test]
    async fn test_entitlement_error_carries_upgrade_prompt() {
        let response = AppError::from(GenerationError::InsufficientEntitlement).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], UPGRADE_PROMPT);
    }
}
