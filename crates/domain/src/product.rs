//! Products and shops as seen by the order pipeline.

use common::{ProductId, ShopId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;

/// A catalog product with its inventory counters.
///
/// `stock` and `sold_count` are only ever changed through the inventory
/// ledger's conditional updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub shop_id: ShopId,
    pub title: String,
    pub price: Money,
    pub stock: u32,
    pub sold_count: u32,
    pub is_active: bool,
}

impl Product {
    /// Creates an active product with nothing sold yet.
    pub fn new(shop_id: ShopId, title: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: ProductId::new(),
            shop_id,
            title: title.into(),
            price,
            stock,
            sold_count: 0,
            is_active: true,
        }
    }

    /// Read-only availability check for `quantity` units.
    pub fn ensure_available(&self, quantity: u32) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::ProductUnavailable {
                product_id: self.id,
            });
        }
        if self.stock < quantity {
            return Err(DomainError::InsufficientStock {
                product_id: self.id,
                requested: quantity,
                available: self.stock,
            });
        }
        Ok(())
    }
}

/// A shop and the seller who owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub owner_id: UserId,
    pub name: String,
}

impl Shop {
    /// Creates a new shop for a seller.
    pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: ShopId::new(),
            owner_id,
            name: name.into(),
        }
    }
}
