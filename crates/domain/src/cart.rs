//! Buyer carts.

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::product::Product;

/// A buyer's cart. Created lazily on the first add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub buyer_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for a buyer.
    pub fn for_buyer(buyer_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            buyer_id,
            created_at: Utc::now(),
        }
    }
}

/// A pending selection with the price captured when it was added or updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub qty: u32,
    pub price_snapshot: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a line for `product`, snapshotting its current price.
    pub fn new(cart_id: CartId, product: &Product, qty: u32) -> Self {
        let now = Utc::now();
        Self {
            id: CartItemId::new(),
            cart_id,
            product_id: product.id,
            qty,
            price_snapshot: product.price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the quantity and refreshes the price snapshot from `product`.
    pub fn reprice(&mut self, product: &Product, qty: u32) {
        self.qty = qty;
        self.price_snapshot = product.price;
        self.updated_at = Utc::now();
    }

    /// Returns `qty * price_snapshot`.
    pub fn subtotal(&self) -> Result<Money, DomainError> {
        self.price_snapshot.multiply(self.qty)
    }
}

/// Rejects quantities below one.
pub fn validate_quantity(qty: u32) -> Result<(), DomainError> {
    if qty == 0 {
        return Err(DomainError::Validation(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// A cart line with its computed subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub subtotal: Money,
}

/// The listed contents of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLine>,
    pub total: Money,
}

impl CartSummary {
    /// Builds a summary, computing per-line subtotals and the grand total.
    pub fn from_items(
        cart_id: Option<CartId>,
        items: Vec<CartItem>,
    ) -> Result<Self, DomainError> {
        let lines = items
            .into_iter()
            .map(|item| {
                Ok(CartLine {
                    subtotal: item.subtotal()?,
                    item,
                })
            })
            .collect::<Result<Vec<CartLine>, DomainError>>()?;
        let total = Money::total(lines.iter().map(|line| line.subtotal))?;
        Ok(Self {
            cart_id,
            lines,
            total,
        })
    }

    /// Returns true if there are no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
