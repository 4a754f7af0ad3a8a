//! Admin identity types.
//!
//! [`AdminProfile`] is the allow-list row; [`AdminContext`] is what a
//! successful pass through the admin gate hands to a handler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{AdminProfileId, AdminRole, Email};

/// Subject reported for requests authenticated with the legacy shared secret.
pub const LEGACY_ADMIN_ID: &str = "legacy-admin";

/// An allow-listed admin (row in `admin_profile`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    /// Row ID.
    pub id: AdminProfileId,
    /// User ID at the identity provider.
    pub identity_id: String,
    /// Email address; the allow-list match key.
    pub email: Email,
    /// When the admin was granted access.
    pub created_at: DateTime<Utc>,
}

/// How the caller proved they are an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthSource {
    /// Signed admin token.
    Jwt,
    /// Pre-JWT shared secret.
    Legacy,
    /// Identity-provider session plus allow-list lookup.
    Identity,
}

/// The authenticated admin for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminContext {
    /// Opaque subject identifier.
    pub id: String,
    /// Admin's email address.
    pub email: String,
    /// Always [`AdminRole::Admin`].
    pub role: AdminRole,
    /// Credential path that produced this context.
    pub source: AuthSource,
}

impl AdminContext {
    /// Context synthesized for the legacy shared-secret path.
    #[must_use]
    pub fn legacy(email: &Email) -> Self {
        Self {
            id: LEGACY_ADMIN_ID.to_string(),
            email: email.to_string(),
            role: AdminRole::Admin,
            source: AuthSource::Legacy,
        }
    }

    /// Context for an identity-provider user found on the allow-list.
    #[must_use]
    pub fn from_profile(identity_id: &str, profile: &AdminProfile) -> Self {
        Self {
            id: identity_id.to_string(),
            email: profile.email.to_string(),
            role: AdminRole::Admin,
            source: AuthSource::Identity,
        }
    }
}
