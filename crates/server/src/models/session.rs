//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use propscribe_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identifier issued by the identity provider.
    pub id: UserId,
    /// Email reported by the identity provider, if any.
    pub email: Option<String>,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the PKCE code verifier of a pending sign-in.
    pub const PKCE_VERIFIER: &str = "pkce_verifier";

    /// Key for the post-sign-in redirect path.
    pub const POST_LOGIN_REDIRECT: &str = "post_login_redirect";
}
