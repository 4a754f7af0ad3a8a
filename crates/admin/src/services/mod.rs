//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Admin token service and the token/identity admin gates

pub mod auth;

pub use auth::{AdminAuthenticator, TokenError, TokenService};
