//! Product list route handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::state::AppState;

/// Product listing.
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

/// List catalog products for the admin table.
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<ProductsResponse>, AppError> {
    let products = state.products().list().await?;
    Ok(Json(ProductsResponse { products }))
}
