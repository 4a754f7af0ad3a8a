//! Admin authentication.
//!
//! Two ways in, both ending in an [`AdminContext`]:
//!
//! - **Token-based**: a signed admin token (or, for old clients, the legacy
//!   shared secret) in `Authorization: Bearer` / `x-admin-session`.
//! - **Identity-based**: a Stack Auth session in `x-stack-access-token`, whose
//!   email must be on the `admin_profile` allow-list.
//!
//! Route handlers do not call these directly; they take one of the extractors
//! in [`crate::middleware::auth`].

mod error;
pub mod token;

pub use error::TokenError;
pub use token::{AdminClaims, REFRESH_WINDOW, TokenService, extract_token};

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use tracing::instrument;

use atelier_core::Email;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::identity::{ACCESS_TOKEN_HEADER, IdentityUser};
use crate::models::{AdminContext, AdminProfile, AuthSource};
use crate::state::AppState;

/// Message for requests that carry no usable credentials.
pub const AUTH_REQUIRED: &str = "authentication required";

/// Message for tokens that neither verify nor match the legacy secret.
pub const INVALID_TOKEN: &str = "invalid or expired token";

/// Message for signed-in users who are not on the allow-list.
pub const ADMIN_REQUIRED: &str = "admin access required";

/// How a route decides who the caller is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAuthenticator {
    /// Signed admin token or legacy shared secret.
    TokenBased,
    /// Identity-provider session plus allow-list lookup.
    IdentityBased,
}

impl AdminAuthenticator {
    /// Pick token-based when the request carries an admin token header.
    #[must_use]
    pub fn for_request(headers: &HeaderMap) -> Self {
        if extract_token(headers).is_some() {
            Self::TokenBased
        } else {
            Self::IdentityBased
        }
    }

    /// Run this authenticator against the request headers.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized`, `AppError::Forbidden`, or a server
    /// error if the identity provider cannot be reached.
    pub async fn authenticate(
        self,
        state: &AppState,
        headers: &HeaderMap,
    ) -> Result<AdminContext, AppError> {
        match self {
            Self::TokenBased => authenticate_token(state, headers).map(|(context, _)| context),
            Self::IdentityBased => authenticate_identity(state, headers).await,
        }
    }
}

/// Token gate. Returns the admin and the raw token that authenticated them.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when no token is present or the token is
/// neither a valid admin token nor the legacy secret.
pub fn authenticate_token<'h>(
    state: &AppState,
    headers: &'h HeaderMap,
) -> Result<(AdminContext, &'h str), AppError> {
    let token =
        extract_token(headers).ok_or_else(|| AppError::Unauthorized(AUTH_REQUIRED.to_string()))?;

    if let Ok(claims) = state.tokens().verify(token) {
        let context = AdminContext {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            source: AuthSource::Jwt,
        };
        return Ok((context, token));
    }

    let auth = state.auth_config();
    if matches_legacy_secret(auth, token) {
        tracing::warn!("admin authenticated with legacy session secret");
        return Ok((AdminContext::legacy(&auth.legacy_email), token));
    }

    Err(AppError::Unauthorized(INVALID_TOKEN.to_string()))
}

/// Identity gate: signed-in user whose email is on the allow-list.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` without a session, `AppError::Forbidden`
/// when the user is not an admin, and a server error if the identity provider
/// fails.
#[instrument(skip_all)]
pub async fn authenticate_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AdminContext, AppError> {
    let user = resolve_identity(state, headers).await?;

    match find_admin(state, &user).await {
        Some(profile) => Ok(AdminContext::from_profile(&user.id, &profile)),
        None => Err(AppError::Forbidden(ADMIN_REQUIRED.to_string())),
    }
}

/// Resolve the signed-in identity-provider user behind the request.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if there is no session,
/// `AppError::Identity` on provider failures, and `AppError::Internal` when no
/// identity provider is configured.
pub async fn resolve_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<IdentityUser, AppError> {
    let access_token = headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized(AUTH_REQUIRED.to_string()))?;

    let provider = state
        .identity()
        .ok_or_else(|| AppError::Internal("identity provider not configured".to_string()))?;

    provider
        .current_user(access_token)
        .await
        .map_err(|e| {
            tracing::error!(operation = "current_user", error = %e, "identity provider call failed");
            AppError::Identity(e)
        })?
        .ok_or_else(|| AppError::Unauthorized(AUTH_REQUIRED.to_string()))
}

/// Allow-list lookup for an identity-provider user.
///
/// Fails closed: a user without an email, an unparsable email, or a lookup
/// error all yield `None`.
pub async fn find_admin(state: &AppState, user: &IdentityUser) -> Option<AdminProfile> {
    let email = match user.primary_email.as_deref().map(Email::parse) {
        Some(Ok(email)) => email,
        Some(Err(e)) => {
            tracing::warn!(user_id = %user.id, error = %e, "identity user has invalid email");
            return None;
        }
        None => return None,
    };

    match state.admins().find_by_email(&email).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(
                operation = "find_by_email",
                user_id = %user.id,
                error = %e,
                "admin allow-list lookup failed"
            );
            None
        }
    }
}

/// Check login credentials in constant time.
///
/// Returns `false` when login credentials are not configured.
#[must_use]
pub fn check_login(auth: &AuthConfig, username: &str, password: &str) -> bool {
    use secrecy::ExposeSecret;

    let Some(login) = &auth.login else {
        tracing::warn!("login attempted but ADMIN_USERNAME/ADMIN_PASSWORD are not set");
        return false;
    };

    let user_ok = login.username.as_bytes().ct_eq(username.as_bytes());
    let pass_ok = login
        .password
        .expose_secret()
        .as_bytes()
        .ct_eq(password.as_bytes());
    (user_ok & pass_ok).into()
}

fn matches_legacy_secret(auth: &AuthConfig, token: &str) -> bool {
    use secrecy::ExposeSecret;

    auth.legacy_session_secret
        .as_ref()
        .is_some_and(|secret| bool::from(secret.expose_secret().as_bytes().ct_eq(token.as_bytes())))
}
