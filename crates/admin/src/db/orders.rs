//! Order repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use atelier_core::{CurrencyCode, OrderId, OrderStatus, Price};

use super::{OrderRepository, RepositoryError};
use crate::models::{LineItem, Order, OrderFilter};

const ORDER_COLUMNS: &str =
    "id, status, total, currency_code, line_items, version, created_at, updated_at";

/// Internal row type for `orders` queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    status: OrderStatus,
    total: Decimal,
    currency_code: String,
    line_items: Json<Vec<LineItem>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency_code: CurrencyCode = row.currency_code.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            status: row.status,
            total: Price::new(row.total, currency_code),
            line_items: row.line_items.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` implementation of [`OrderRepository`].
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    #[instrument(skip(self))]
    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::order_status IS NULL OR status = $1) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(filter.status)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    async fn update_status(
        &self,
        id: OrderId,
        expected_version: i64,
        status: OrderStatus,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "UPDATE orders \
             SET status = $3, version = version + 1, updated_at = now() \
             WHERE id = $1 AND version = $2 \
             RETURNING {ORDER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(expected_version)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }
}
