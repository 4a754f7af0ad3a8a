//! Admin authentication route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use atelier_core::AdminRole;

use crate::error::AppError;
use crate::middleware::RequireTokenAdmin;
use crate::models::{AdminContext, AuthSource};
use crate::services::TokenError;
use crate::services::auth::{self, INVALID_TOKEN};
use crate::state::AppState;

const LEGACY_NOT_REFRESHED: &str = "legacy session tokens are not refreshed";

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Shared secret for clients that still speak the pre-token protocol.
    pub legacy_session_token: Option<String>,
    pub user: AdminContext,
}

/// Result of `POST /admin/auth/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
    pub message: String,
}

/// Result of `GET /admin/auth/refresh`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub valid: bool,
    pub should_refresh: bool,
    pub user: AdminContext,
}

/// Result of `GET /admin/check-role`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCheck {
    pub is_admin: bool,
    pub user_id: String,
    pub email: Option<String>,
}

/// Exchange username and password for an admin token.
///
/// Runs behind the login rate limiter.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(request) =
        body.map_err(|_| AppError::BadRequest("username and password are required".to_string()))?;

    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let config = state.auth_config();
    if !auth::check_login(config, &request.username, &request.password) {
        tracing::warn!("admin login failed");
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    let user = AdminContext {
        id: request.username,
        email: config.legacy_email.to_string(),
        role: AdminRole::Admin,
        source: AuthSource::Jwt,
    };
    let token = state
        .tokens()
        .issue(&user.id, &user.email, user.role)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(admin = %user.id, "admin logged in");

    Ok(Json(LoginResponse {
        token,
        legacy_session_token: config
            .legacy_session_secret
            .as_ref()
            .map(|secret| secret.expose_secret().to_string()),
        user,
    }))
}

/// Swap a token that is close to expiry for a fresh one.
#[instrument(skip_all, fields(admin = %session.admin.id))]
pub async fn refresh(
    State(state): State<AppState>,
    session: RequireTokenAdmin,
) -> Result<Json<RefreshResponse>, AppError> {
    let RequireTokenAdmin { admin, token } = session;

    if admin.source == AuthSource::Legacy {
        return Ok(Json(RefreshResponse {
            token,
            message: LEGACY_NOT_REFRESHED.to_string(),
        }));
    }

    let refreshed = state.tokens().refresh(&token).map_err(|e| match e {
        TokenError::Encode(_) => AppError::Internal(e.to_string()),
        TokenError::Expired | TokenError::Invalid(_) => {
            AppError::Unauthorized(INVALID_TOKEN.to_string())
        }
    })?;

    let message = if refreshed == token {
        "token still valid"
    } else {
        "token refreshed"
    };

    Ok(Json(RefreshResponse {
        token: refreshed,
        message: message.to_string(),
    }))
}

/// Report whether the presented token is valid and due for refresh.
pub async fn session_status(
    State(state): State<AppState>,
    RequireTokenAdmin { admin, token }: RequireTokenAdmin,
) -> Json<SessionStatus> {
    let should_refresh = admin.source == AuthSource::Jwt && state.tokens().should_refresh(&token);

    Json(SessionStatus {
        valid: true,
        should_refresh,
        user: admin,
    })
}

/// Tell the storefront whether the signed-in identity is an admin.
///
/// Unlike the admin gate this answers `isAdmin: false` instead of 403.
#[instrument(skip_all)]
pub async fn check_role(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RoleCheck>, AppError> {
    let user = auth::resolve_identity(&state, &headers).await?;
    let is_admin = auth::find_admin(&state, &user).await.is_some();

    Ok(Json(RoleCheck {
        is_admin,
        user_id: user.id,
        email: user.primary_email,
    }))
}
