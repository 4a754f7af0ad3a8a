//! Identity-provider integration.
//!
//! The identity provider (Stack Auth) owns user accounts and sessions. The
//! admin API only asks it one question: who is the signed-in user behind this
//! access token? Authorization is decided separately against the
//! `admin_profile` allow-list.

mod stack;

pub use stack::StackAuthClient;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Request header carrying the caller's identity-provider access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-stack-access-token";

/// Errors talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an unexpected status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be built from configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    /// Provider user ID.
    pub id: String,
    /// Primary email, if the user has one on file.
    pub primary_email: Option<String>,
}

/// Resolves access tokens to signed-in users.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the user behind `access_token`.
    ///
    /// Returns `Ok(None)` when the provider says the token does not belong to
    /// a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` on transport failures or unexpected responses.
    async fn current_user(&self, access_token: &str)
    -> Result<Option<IdentityUser>, IdentityError>;
}
