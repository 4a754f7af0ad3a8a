//! Order management route handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use atelier_core::{OrderId, OrderStatus, Transition};

use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{Order, OrderFilter};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Query parameters for the order listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

/// Body of a status change.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Order listing.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

/// A single order.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

fn parse_status(value: &str) -> Result<OrderStatus, AppError> {
    value
        .parse()
        .map_err(|e: atelier_core::ParseOrderStatusError| AppError::BadRequest(e.to_string()))
}

fn parse_order_id(value: &str) -> Result<OrderId, AppError> {
    value
        .parse::<i64>()
        .map(OrderId::new)
        .map_err(|_| AppError::BadRequest(format!("invalid order id '{value}'")))
}

fn order_not_found() -> AppError {
    AppError::NotFound("order not found".to_string())
}

/// List orders, optionally filtered by status.
#[instrument(skip_all, fields(admin = %admin.id))]
pub async fn list(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrdersResponse>, AppError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(parse_status)
        .transpose()?;

    let filter = OrderFilter {
        status,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };

    let orders = state.orders().list(filter).await?;
    Ok(Json(OrdersResponse { orders }))
}

/// Fetch one order.
#[instrument(skip_all, fields(admin = %admin.id, order_id = %id))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, AppError> {
    let id = parse_order_id(&id)?;
    let order = state.orders().get(id).await?.ok_or_else(order_not_found)?;
    Ok(Json(OrderResponse { order }))
}

/// Move an order to a new status.
///
/// Requesting the current status returns the order untouched. The write is
/// conditional on the version read here, so a concurrent change yields 409.
#[instrument(skip_all, fields(admin = %admin.id, order_id = %id))]
pub async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let Json(request) = body.map_err(|_| {
        AppError::BadRequest(format!(
            "status is required; valid values: {}",
            OrderStatus::valid_values()
        ))
    })?;
    let requested = parse_status(&request.status)?;
    let id = parse_order_id(&id)?;

    let order = state.orders().get(id).await?.ok_or_else(order_not_found)?;

    let (from, to) = match order.status.transition(requested) {
        Ok(Transition::Unchanged(_)) => return Ok(Json(OrderResponse { order })),
        Ok(Transition::Changed { from, to }) => (from, to),
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };

    let updated = state
        .orders()
        .update_status(id, order.version, to)
        .await?
        .ok_or_else(|| {
            tracing::warn!(expected_version = order.version, "order status write lost a race");
            AppError::Conflict("order was modified concurrently; reload and retry".to_string())
        })?;

    tracing::info!(admin_email = %admin.email, %from, %to, "order status changed");

    Ok(Json(OrderResponse { order: updated }))
}
