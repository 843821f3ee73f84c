//! Domain error types.

use common::{CartItemId, OrderId, OrderItemId, ProductId};
use thiserror::Error;

use crate::order::OrderItemStatus;

/// Errors raised by marketplace rules.
///
/// Every variant carries enough context for the caller to act on it. None of
/// them is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Malformed or missing input, rejected before any state is touched.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The cart is absent or the set of items to check out is empty.
    #[error("Cart is empty")]
    EmptyCart,

    /// Some selected cart item ids do not belong to the buyer's cart.
    #[error("Selected items are not in the cart: {}", join_ids(.missing))]
    InvalidSelection { missing: Vec<CartItemId> },

    /// The product is inactive or no longer exists.
    #[error("Product {product_id} is unavailable")]
    ProductUnavailable { product_id: ProductId },

    /// The product does not have enough stock.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The requested status change is not permitted.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: OrderItemStatus,
        to: OrderItemStatus,
    },

    /// The caller does not own the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (or not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The order has an item that was already shipped or completed.
    #[error("Order {order_id} cannot be cancelled: item {item_id} is {status}")]
    OrderNotCancellable {
        order_id: OrderId,
        item_id: OrderItemId,
        status: OrderItemStatus,
    },

    /// Stock and status bookkeeping disagree. Never expected.
    #[error("Internal consistency fault: {0}")]
    InternalConsistencyFault(String),
}

impl DomainError {
    /// Shorthand for a [`DomainError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns a stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "VALIDATION",
            DomainError::EmptyCart => "EMPTY_CART",
            DomainError::InvalidSelection { .. } => "INVALID_SELECTION",
            DomainError::ProductUnavailable { .. } => "PRODUCT_UNAVAILABLE",
            DomainError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            DomainError::InvalidTransition { .. } => "INVALID_TRANSITION",
            DomainError::Forbidden(_) => "FORBIDDEN",
            DomainError::NotFound { .. } => "NOT_FOUND",
            DomainError::OrderNotCancellable { .. } => "ORDER_NOT_CANCELLABLE",
            DomainError::InternalConsistencyFault(_) => "INTERNAL_CONSISTENCY_FAULT",
        }
    }
}

fn join_ids(ids: &[CartItemId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
