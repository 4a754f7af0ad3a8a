//! Product list view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use atelier_core::{Price, ProductId};

/// A catalog product as shown in the admin product table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Price,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
