//! Domain layer for the marketplace order pipeline.
//!
//! This crate holds the pure business model:
//! - Products, shops and buyer carts with price snapshots
//! - Shop-scoped orders with address and price snapshots
//! - The order-item fulfillment state machine and its transition table
//! - The domain error taxonomy

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod product;

pub use cart::{Cart, CartItem, CartLine, CartSummary, validate_quantity};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    Actor, AddressSnapshot, Order, OrderCode, OrderItem, OrderItemStatus, PaymentStatus,
    PlacedOrder, ShippingAddress, UnknownStatus, is_allowed,
};
pub use product::{Product, Shop};
