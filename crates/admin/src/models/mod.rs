//! Domain models for admin.

pub mod admin;
pub mod order;
pub mod product;

pub use admin::{AdminContext, AdminProfile, AuthSource, LEGACY_ADMIN_ID};
pub use order::{LineItem, Order, OrderFilter};
pub use product::Product;
