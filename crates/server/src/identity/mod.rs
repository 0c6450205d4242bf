//! Identity provider integration (hosted OAuth sign-in with PKCE).
//!
//! # Flow
//!
//! 1. `/auth/login` stores a PKCE verifier in the session and redirects to
//!    [`IdentityProvider::authorize_url`]
//! 2. The provider redirects back to `/auth/callback?code=...`
//! 3. [`IdentityProvider::exchange_code`] trades the code and verifier for
//!    the signed-in user
//! 4. The user is stored in the session and their profile is ensured

pub mod client;
pub mod error;
pub mod pkce;

use async_trait::async_trait;
use propscribe_core::UserId;

pub use client::IdentityClient;
pub use error::IdentityError;

/// The user returned by a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// Hosted sign-in operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's sign-in page.
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> Result<String, IdentityError>;

    /// Exchange an authorization code for the signed-in user.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<IdentityUser, IdentityError>;
}
