//! Atelier Admin library.
//!
//! JSON API behind the back-office: admin login and token refresh, the
//! identity-provider admin check, product listing and order status
//! management. The binary in `main.rs` only adds configuration, telemetry
//! and the listener around [`app`].
//!
//! # Security
//!
//! Every `/admin/*` route except login and `check-role` sits behind an admin
//! gate (see [`middleware::auth`]). Order status changes go through the
//! single transition table in `atelier_core`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{Router, http::StatusCode};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Requests running longer than this are answered with 408.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the admin router with its middleware stack (Sentry layers excluded).
pub fn app(state: AppState) -> Router {
    routes::routes(&state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
