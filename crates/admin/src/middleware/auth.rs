//! Authentication extractors for admin routes.
//!
//! A handler that takes one of these only runs once the caller has passed the
//! matching admin gate; otherwise the extractor's `AppError` becomes the
//! response.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn list_orders(
//!     RequireAdmin(admin): RequireAdmin,
//!     State(state): State<AppState>,
//! ) -> Result<Json<OrdersResponse>, AppError> {
//!     tracing::info!(admin = %admin.email, "listing orders");
//!     // ...
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::{AppError, set_sentry_user};
use crate::models::AdminContext;
use crate::services::auth::{self, AdminAuthenticator};
use crate::state::AppState;

/// Admin authenticated by signed token or legacy secret.
///
/// Carries the raw token so refresh endpoints can inspect it.
pub struct RequireTokenAdmin {
    pub admin: AdminContext,
    pub token: String,
}

impl FromRequestParts<AppState> for RequireTokenAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (admin, token) = auth::authenticate_token(state, &parts.headers)?;
        set_sentry_user(&admin.id, &admin.email);

        Ok(Self {
            admin,
            token: token.to_string(),
        })
    }
}

/// Admin authenticated by identity-provider session and allow-list.
pub struct RequireIdentityAdmin(pub AdminContext);

impl FromRequestParts<AppState> for RequireIdentityAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let admin = auth::authenticate_identity(state, &parts.headers).await?;
        set_sentry_user(&admin.id, &admin.email);
        Ok(Self(admin))
    }
}

/// Admin authenticated either way.
///
/// Token-based when the request carries an admin token header, identity-based
/// otherwise.
pub struct RequireAdmin(pub AdminContext);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let admin = AdminAuthenticator::for_request(&parts.headers)
            .authenticate(state, &parts.headers)
            .await?;
        set_sentry_user(&admin.id, &admin.email);
        Ok(Self(admin))
    }
}
