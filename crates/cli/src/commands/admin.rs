//! Admin allow-list commands.
//!
//! The server only reads `admin_profile`; these commands are the supported
//! way to change it.

use thiserror::Error;

use atelier_admin::db::{self, PgAdminDirectory, RepositoryError};
use atelier_core::Email;

/// Errors that can occur during allow-list operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: ADMIN_DATABASE_URL")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Already on the allow-list.
    #[error("Admin already exists with email or identity ID: {0}")]
    AlreadyAdmin(String),

    /// Not on the allow-list.
    #[error("No admin with email: {0}")]
    NotAdmin(String),

    /// Repository error.
    #[error(transparent)]
    Repository(RepositoryError),
}

async fn directory() -> Result<PgAdminDirectory, AdminError> {
    let database_url = super::database_url().ok_or(AdminError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&database_url).await?;
    Ok(PgAdminDirectory::new(pool))
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse(email).map_err(|e| AdminError::InvalidEmail(format!("{email}: {e}")))
}

/// Add an identity-provider user to the allow-list.
///
/// # Errors
///
/// Returns `AdminError::AlreadyAdmin` if the email or identity ID is taken.
pub async fn grant(email: &str, identity_id: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let identity_id = identity_id.trim();

    let profile = directory()
        .await?
        .grant(identity_id, &email)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::AlreadyAdmin(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin granted: {} (identity {}, row {})",
        profile.email,
        profile.identity_id,
        profile.id
    );
    Ok(())
}

/// Remove an admin from the allow-list.
///
/// # Errors
///
/// Returns `AdminError::NotAdmin` if nothing matched.
pub async fn revoke(email: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;

    directory()
        .await?
        .revoke(&email)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::NotAdmin(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!("Admin revoked: {}", email);
    Ok(())
}

/// Log every allow-listed admin.
///
/// # Errors
///
/// Returns `AdminError` if the query fails.
pub async fn list() -> Result<(), AdminError> {
    let admins = directory()
        .await?
        .list_all()
        .await
        .map_err(AdminError::Repository)?;

    if admins.is_empty() {
        tracing::warn!("Allow-list is empty; identity-gated routes will answer 403");
    }
    for admin in &admins {
        tracing::info!(
            "{}  {}  since {}",
            admin.email,
            admin.identity_id,
            admin.created_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
