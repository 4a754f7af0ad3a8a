//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness
//! GET  /health/ready               - Readiness (database reachable)
//!
//! # Auth
//! POST /admin/auth                 - Username/password login (rate-limited)
//! POST /admin/auth/refresh         - Reissue a token close to expiry
//! GET  /admin/auth/refresh         - Token validity and refresh hint
//! GET  /admin/check-role           - Is the identity session an admin?
//!
//! # Catalog and orders (token or identity admin)
//! GET  /admin/products             - Product list
//! GET  /admin/orders               - Order list (?status=&limit=)
//! GET  /admin/orders/{id}          - Order detail
//! PUT  /admin/orders/{id}/status   - Change order status
//! ```

pub mod auth;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use crate::middleware::login_rate_limit;
use crate::state::AppState;

/// Build the route table.
///
/// Takes the state so the login rate limiter can reach the attempt counter.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route(
            "/admin/auth",
            post(auth::login).layer(from_fn_with_state(state.clone(), login_rate_limit)),
        )
        .route(
            "/admin/auth/refresh",
            get(auth::session_status).post(auth::refresh),
        )
        .route("/admin/check-role", get(auth::check_role))
        .route("/admin/products", get(products::list))
        .route("/admin/orders", get(orders::list))
        .route("/admin/orders/{id}", get(orders::show))
        .route("/admin/orders/{id}/status", put(orders::update_status))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
