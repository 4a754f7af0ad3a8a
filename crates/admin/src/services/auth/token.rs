//! Signed admin session tokens (HS256 JWT).
//!
//! Tokens are stateless: there is no server-side session table and no
//! revocation list, so a token is good until its `exp`. Clients are told to
//! swap a token for a fresh one once less than [`REFRESH_WINDOW`] remains.

use std::collections::HashSet;
use std::time::Duration;

use axum::http::{HeaderMap, header::AUTHORIZATION};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use atelier_core::AdminRole;

use super::TokenError;
use crate::config::AuthConfig;

/// `iss` claim on every admin token.
pub const TOKEN_ISSUER: &str = "atelier-storefront";

/// `aud` claim on every admin token.
pub const TOKEN_AUDIENCE: &str = "atelier-admin";

/// Header accepted as a fallback when no bearer token is sent.
pub const ADMIN_SESSION_HEADER: &str = "x-admin-session";

/// Tokens with less than this much lifetime left should be reissued.
pub const REFRESH_WINDOW: Duration = Duration::from_secs(60 * 60);

const BEARER_PREFIX: &str = "Bearer ";

/// Claims carried by an admin token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Opaque admin identifier.
    pub sub: String,
    pub email: String,
    pub role: AdminRole,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expires at (seconds since epoch).
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Only `exp` is read when inspecting a token without verifying it.
#[derive(Debug, Deserialize)]
struct UnverifiedClaims {
    exp: Option<i64>,
}

/// Issues and checks admin tokens with the shared HS256 secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: TimeDelta,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("keys", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenService {
    /// Build a token service from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime: config.token_lifetime,
        }
    }

    /// Configured token lifetime.
    #[must_use]
    pub const fn lifetime(&self) -> TimeDelta {
        self.lifetime
    }

    /// Issue a token with the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn issue(&self, subject: &str, email: &str, role: AdminRole) -> Result<String, TokenError> {
        self.issue_with_lifetime(subject, email, role, self.lifetime)
    }

    /// Issue a token that expires `lifetime` from now.
    ///
    /// A negative lifetime yields a token that is already expired.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn issue_with_lifetime(
        &self,
        subject: &str,
        email: &str,
        role: AdminRole,
        lifetime: TimeDelta,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = AdminClaims {
            sub: subject.to_string(),
            email: email.to_string(),
            role,
            iat: now,
            exp: now + lifetime.num_seconds(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encode)
    }

    /// Verify signature, issuer, audience and expiry.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired` or `TokenError::Invalid`.
    pub fn verify(&self, token: &str) -> Result<AdminClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let claims = jsonwebtoken::decode::<AdminClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "admin token rejected");
                TokenError::from(e)
            })?;

        // The library accepts exp == now; a token is valid only strictly before exp.
        if claims.exp <= Utc::now().timestamp() {
            tracing::debug!(sub = %claims.sub, "admin token rejected: expired");
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Whether the token is past its `exp`.
    ///
    /// The signature is not checked. Undecodable tokens and tokens without an
    /// `exp` claim count as expired.
    #[must_use]
    pub fn is_expired(&self, token: &str) -> bool {
        read_expiry(token).is_none_or(|exp| exp <= Utc::now().timestamp())
    }

    /// Whether the token has less than [`REFRESH_WINDOW`] left.
    ///
    /// The signature is not checked. Undecodable tokens should always be
    /// refreshed.
    #[must_use]
    pub fn should_refresh(&self, token: &str) -> bool {
        let window = i64::try_from(REFRESH_WINDOW.as_secs()).unwrap_or(i64::MAX);
        read_expiry(token).is_none_or(|exp| exp - Utc::now().timestamp() < window)
    }

    /// Reissue a verified token for the same admin when it is close to expiry.
    ///
    /// Tokens with plenty of lifetime left are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token does not verify or signing fails.
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        let claims = self.verify(token)?;

        if self.should_refresh(token) {
            tracing::info!(sub = %claims.sub, "reissuing admin token");
            self.issue(&claims.sub, &claims.email, claims.role)
        } else {
            Ok(token.to_string())
        }
    }
}

/// Decode `exp` without checking the signature or any other claim.
fn read_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    jsonwebtoken::decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| data.claims.exp)
}

/// Pull an admin token out of request headers.
///
/// `Authorization: Bearer <token>` wins; `x-admin-session: <token>` is the
/// fallback. Empty values are ignored.
#[must_use]
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        headers
            .get(ADMIN_SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}
