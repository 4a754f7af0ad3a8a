//! Login rate limiting.
//!
//! Fixed attempt budget per client: after `max_attempts` failed logins the
//! client gets 429 until `window` has passed since its most recent failed
//! attempt. Requests rejected with 429 never reach the credential check and
//! do not extend the lockout. A successful login clears the count.
//!
//! Clients are keyed by [`ClientIpSource`]: the one header the fronting proxy
//! overwrites, else the socket peer address. Other forwarding headers are
//! client-controlled and ignored.
//!
//! The counter sits behind [`AttemptCounter`] so a shared store can replace
//! the in-process cache when the service runs on more than one machine.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use moka::future::Cache;

use crate::config::LoginLimitConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Key used when neither the trusted header nor the peer address is known.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Per-client attempt counter.
#[async_trait]
pub trait AttemptCounter: Send + Sync {
    /// Whether `key` has used up its attempts.
    async fn is_limited(&self, key: &str) -> bool;

    /// Record a failed attempt for `key`.
    async fn increment(&self, key: &str);

    /// Forget all attempts for `key`.
    async fn reset(&self, key: &str);
}

/// In-process [`AttemptCounter`] backed by a `moka` cache.
///
/// Entries live for the window after their last write, so each failed
/// attempt restarts the window and lookups do not.
pub struct MemoryAttemptCounter {
    attempts: Cache<String, u32>,
    max_attempts: u32,
}

impl MemoryAttemptCounter {
    /// Create a counter from the login-limit settings.
    #[must_use]
    pub fn new(config: &LoginLimitConfig) -> Self {
        Self::with_window(config.max_attempts, config.window)
    }

    /// Create a counter with explicit limits.
    #[must_use]
    pub fn with_window(max_attempts: u32, window: Duration) -> Self {
        Self {
            attempts: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(window)
                .build(),
            max_attempts,
        }
    }
}

#[async_trait]
impl AttemptCounter for MemoryAttemptCounter {
    async fn is_limited(&self, key: &str) -> bool {
        self.attempts
            .get(key)
            .await
            .is_some_and(|count| count >= self.max_attempts)
    }

    async fn increment(&self, key: &str) {
        self.attempts
            .entry(key.to_string())
            .and_upsert_with(|entry| async move {
                entry.map_or(1, |e| e.into_value().saturating_add(1))
            })
            .await;
    }

    async fn reset(&self, key: &str) {
        self.attempts.invalidate(key).await;
    }
}

/// Where the rate limiter reads the client address from.
#[derive(Debug, Clone)]
pub struct ClientIpSource {
    trusted_header: Option<HeaderName>,
}

impl ClientIpSource {
    /// Build from the login-limit settings.
    #[must_use]
    pub fn new(config: &LoginLimitConfig) -> Self {
        Self {
            trusted_header: config.client_ip_header.clone(),
        }
    }

    /// Trust `header`, falling back to the peer address when it is absent.
    #[must_use]
    pub const fn header(header: HeaderName) -> Self {
        Self {
            trusted_header: Some(header),
        }
    }

    /// Key on the socket peer address only.
    #[must_use]
    pub const fn peer() -> Self {
        Self {
            trusted_header: None,
        }
    }

    /// Rate-limit key for a request.
    ///
    /// For a list-valued header the last entry wins, since that is the one
    /// the proxy appended.
    #[must_use]
    pub fn client_key(&self, parts: &Parts) -> String {
        let from_header = self.trusted_header.as_ref().and_then(|name| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        });

        from_header
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

/// Middleware guarding the login route.
///
/// Limited clients are rejected before the handler runs. Afterwards a
/// successful response clears the client's count and anything else adds to it.
pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let key = state.login_client_ip().client_key(&parts);
    let request = Request::from_parts(parts, body);
    let counter = state.login_attempts();

    if counter.is_limited(&key).await {
        tracing::warn!(client = %key, "login rate limit exceeded");
        return AppError::RateLimited.into_response();
    }

    let response = next.run(request).await;

    if response.status().is_success() {
        counter.reset(&key).await;
    } else {
        counter.increment(&key).await;
    }

    response
}
