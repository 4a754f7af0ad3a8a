//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order_status;
pub mod price;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use order_status::{OrderStatus, ParseOrderStatusError, Transition, TransitionError};
pub use price::{CurrencyCode, Price};
pub use role::AdminRole;
