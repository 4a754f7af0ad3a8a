//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (`x-request-id`, recorded on the span)
//! 4. Security headers
//! 5. Timeout (30s)
//! 6. Login rate limit (`POST /admin/auth` only)
//!
//! Authentication is not a layer: handlers opt in with the extractors in
//! [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{RequireAdmin, RequireIdentityAdmin, RequireTokenAdmin};
pub use rate_limit::{AttemptCounter, ClientIpSource, MemoryAttemptCounter, login_rate_limit};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
