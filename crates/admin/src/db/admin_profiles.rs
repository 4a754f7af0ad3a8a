//! Admin allow-list repository.
//!
//! The server only reads this table; rows are managed out-of-band with
//! `atelier-cli admin grant|revoke`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use atelier_core::{AdminProfileId, Email};

use super::{AdminDirectory, RepositoryError};
use crate::models::AdminProfile;

/// Internal row type for `admin_profile` queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminProfileRow {
    id: i64,
    identity_id: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminProfileRow> for AdminProfile {
    type Error = RepositoryError;

    fn try_from(row: AdminProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in admin_profile: {e}"))
        })?;

        Ok(Self {
            id: AdminProfileId::new(row.id),
            identity_id: row.identity_id,
            email,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL` implementation of the admin allow-list.
#[derive(Clone)]
pub struct PgAdminDirectory {
    pool: PgPool,
}

impl PgAdminDirectory {
    /// Create a new allow-list repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List every allow-listed admin, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a row is invalid.
    pub async fn list_all(&self) -> Result<Vec<AdminProfile>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminProfileRow>(
            r"
            SELECT id, identity_id, email, created_at
            FROM admin_profile
            ORDER BY created_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Add an admin to the allow-list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or identity ID is already listed.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn grant(
        &self,
        identity_id: &str,
        email: &Email,
    ) -> Result<AdminProfile, RepositoryError> {
        let row = sqlx::query_as::<_, AdminProfileRow>(
            r"
            INSERT INTO admin_profile (identity_id, email)
            VALUES ($1, $2)
            RETURNING id, identity_id, email, created_at
            ",
        )
        .bind(identity_id)
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("admin already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    /// Remove an admin from the allow-list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no row matched.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn revoke(&self, email: &Email) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM admin_profile WHERE email = $1")
            .bind(email.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AdminDirectory for PgAdminDirectory {
    #[instrument(skip(self), fields(email = %email))]
    async fn find_by_email(&self, email: &Email) -> Result<Option<AdminProfile>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminProfileRow>(
            r"
            SELECT id, identity_id, email, created_at
            FROM admin_profile
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}
