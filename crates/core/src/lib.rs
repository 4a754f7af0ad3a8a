//! Atelier Core - Shared types library.
//!
//! This crate provides the types used across the Atelier back-office:
//! - `admin` - Admin JSON API (token gate, allow-list gate, order management)
//! - `cli` - Command-line tools for migrations and admin allow-list management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. The order lifecycle lives here so every caller
//! shares a single transition table.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, emails, roles and the order status machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
