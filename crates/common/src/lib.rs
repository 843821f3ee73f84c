//! Shared identifier types for the marketplace order pipeline.

pub mod types;

pub use types::{CartId, CartItemId, OrderId, OrderItemId, ProductId, ShopId, UserId};
