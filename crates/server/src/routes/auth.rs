//! Sign-in route handlers.
//!
//! Sign-in is delegated to the hosted identity provider using the OAuth
//! authorization-code flow with PKCE. Failures redirect to
//! `/login?error=<code>` so the frontend can show a message.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::identity::pkce;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Where a signed-in user lands when no `next` path was requested.
const DEFAULT_REDIRECT: &str = "/dashboard";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Relative path to return to after sign-in.
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn login_error(code: &str) -> Redirect {
    Redirect::to(&format!("/login?error={code}"))
}

/// Only same-site absolute paths are accepted as redirect targets.
///
/// Browsers drop tabs and newlines while parsing a `Location`, so control
/// characters could turn `/\t/host` into `//host`.
fn is_safe_redirect(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.contains("://")
        && !path.chars().any(char::is_control)
}

/// `GET /auth/login?next=`: start a hosted sign-in.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Redirect {
    let Some(identity) = state.identity() else {
        tracing::warn!("Sign-in requested but no identity provider is configured");
        return login_error("provider_unavailable");
    };
    let Some(base_url) = state.config().base_url.as_deref() else {
        tracing::warn!("Sign-in requested but no public base URL is configured");
        return login_error("provider_unavailable");
    };

    let verifier = pkce::generate_verifier();
    if let Err(e) = session.insert(session_keys::PKCE_VERIFIER, &verifier).await {
        tracing::error!(error = %e, "Failed to store PKCE verifier");
        return login_error("session");
    }

    let next = query.next.filter(|next| is_safe_redirect(next));
    let stored = match next {
        Some(next) => session.insert(session_keys::POST_LOGIN_REDIRECT, next).await,
        None => session
            .remove::<String>(session_keys::POST_LOGIN_REDIRECT)
            .await
            .map(|_| ()),
    };
    if let Err(e) = stored {
        tracing::error!(error = %e, "Failed to store post-login redirect");
        return login_error("session");
    }

    let redirect_to = format!("{base_url}/auth/callback");
    match identity.authorize_url(&redirect_to, &pkce::challenge(&verifier)) {
        Ok(url) => Redirect::to(&url),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build authorize URL");
            login_error(e.redirect_code())
        }
    }
}

/// `GET /auth/callback?code=`: finish sign-in.
///
/// Exchanges the code, stores the user in the session and makes sure the
/// user has a profile (new users start with the free credits).
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    if let Some(error) = query.error {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or_default(),
            "Identity provider returned an error"
        );
        return login_error("access_denied");
    }

    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return login_error("missing_code");
    };

    // The verifier is single-use.
    let verifier = match session.remove::<String>(session_keys::PKCE_VERIFIER).await {
        Ok(Some(verifier)) => verifier,
        Ok(None) => {
            tracing::warn!("Sign-in callback without a pending PKCE verifier");
            return login_error("invalid_state");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read PKCE verifier");
            return login_error("session");
        }
    };

    let Some(identity) = state.identity() else {
        return login_error("provider_unavailable");
    };

    let identity_user = match identity.exchange_code(&code, &verifier).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Code exchange failed");
            return login_error(e.redirect_code());
        }
    };

    if let Err(e) = state
        .profiles()
        .ensure(&identity_user.id, identity_user.email.as_deref())
        .await
    {
        let event_id = sentry::capture_error(&e);
        tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to ensure profile");
        return login_error("profile");
    }

    let next = match session.remove::<String>(session_keys::POST_LOGIN_REDIRECT).await {
        Ok(next) => next.filter(|next| is_safe_redirect(next)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read post-login redirect");
            None
        }
    };

    let user = CurrentUser {
        id: identity_user.id,
        email: identity_user.email,
    };
    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!(error = %e, "Failed to store signed-in user");
        return login_error("session");
    }

    set_sentry_user(&user.id, user.email.as_deref());
    tracing::info!(user_id = %user.id, "User signed in");

    Redirect::to(next.as_deref().unwrap_or(DEFAULT_REDIRECT))
}

/// `POST /auth/logout`
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to clear session on logout");
    }
    clear_sentry_user();
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirects() {
        assert!(is_safe_redirect("/dashboard"));
        assert!(is_safe_redirect("/listings?tab=saved"));
        assert!(!is_safe_redirect("//evil.example"));
        assert!(!is_safe_redirect("https://evil.example"));
        assert!(!is_safe_redirect("/\\evil.example"));
        assert!(!is_safe_redirect("dashboard"));
    }

    #[test]
    fn test_control_characters_rejected() {
        assert!(!is_safe_redirect("/\t/evil.example"));
        assert!(!is_safe_redirect("/\n/evil.example"));
        assert!(!is_safe_redirect("/\r\n/evil.example"));
        assert!(!is_safe_redirect("/dash\nboard"));
        assert!(!is_safe_redirect("/dash\u{0}board"));
    }
}
