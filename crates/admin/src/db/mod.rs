//! Database operations for the admin API.
//!
//! # Database: Supabase `PostgreSQL`
//!
//! ## Tables
//!
//! - `admin_profile` - Admin allow-list (one row per identity-provider user)
//! - `orders` - Orders with their lifecycle status and optimistic-lock version
//! - `products` - Catalog products (read-only here)
//!
//! Handlers depend on the repository traits below rather than on `PgPool`
//! directly; the `Pg*` types are the production implementations.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```

pub mod admin_profiles;
pub mod orders;
pub mod products;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use atelier_core::{Email, OrderId, OrderStatus};

use crate::models::{AdminProfile, Order, OrderFilter, Product};

pub use admin_profiles::PgAdminDirectory;
pub use orders::PgOrderRepository;
pub use products::PgProductCatalog;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Admin allow-list lookups.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Find the allow-list entry whose email matches exactly.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup itself fails.
    async fn find_by_email(&self, email: &Email) -> Result<Option<AdminProfile>, RepositoryError>;
}

/// Order reads and status writes.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// List orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is invalid.
    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError>;

    /// Fetch a single order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or the row is invalid.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Write a new status if the stored version still equals `expected_version`.
    ///
    /// Returns `Ok(None)` when the version no longer matches (or the order
    /// vanished), meaning another writer got there first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the update fails.
    async fn update_status(
        &self,
        id: OrderId,
        expected_version: i64,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// Product list view.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// List products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails or a row is invalid.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
