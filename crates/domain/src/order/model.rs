//! Orders and order items.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderItemId, ProductId, ShopId, UserId};
use serde::{Deserialize, Serialize};

use super::{AddressSnapshot, OrderItemStatus, PaymentStatus};
use crate::cart::CartItem;
use crate::error::DomainError;
use crate::money::Money;
use crate::product::Product;

/// Human-readable order reference, e.g. `ORD-20240102030405678-01-3FA2C1`.
///
/// The timestamp is followed by the order's position within its checkout and a
/// fragment of the order id, so several shops checked out in the same
/// millisecond still get distinct codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    /// Generates a code for the `shop_index`-th order of a checkout.
    pub fn generate(placed_at: DateTime<Utc>, shop_index: usize, order_id: OrderId) -> Self {
        let suffix: String = order_id
            .as_uuid()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect();
        Self(format!(
            "ORD-{}-{:02}-{}",
            placed_at.format("%Y%m%d%H%M%S%3f"),
            shop_index + 1,
            suffix.to_uppercase()
        ))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A shop-scoped order. Immutable apart from `payment_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub code: OrderCode,
    pub buyer_id: UserId,
    pub shop_id: ShopId,
    pub payment_status: PaymentStatus,
    pub total_amount: Money,
    pub address: AddressSnapshot,
    pub created_at: DateTime<Utc>,
}

/// A line of an order, with shop, title and price denormalized from the
/// product at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub shop_id: ShopId,
    pub title: String,
    pub qty: u32,
    pub price_snapshot: Money,
    pub status: OrderItemStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns `qty * price_snapshot`.
    pub fn subtotal(&self) -> Result<Money, DomainError> {
        self.price_snapshot.multiply(self.qty)
    }
}

/// An order together with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl PlacedOrder {
    /// Builds a paid order with NEW items from one shop's cart lines.
    ///
    /// `lines` pairs each cart item with the product it refers to; the item's
    /// price snapshot is kept, the product supplies title and shop. Fails if
    /// the order total does not fit in `Money`.
    pub fn assemble(
        buyer_id: UserId,
        shop_id: ShopId,
        shop_index: usize,
        address: &AddressSnapshot,
        lines: &[(CartItem, Product)],
        placed_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let order_id = OrderId::new();
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|(cart_item, product)| OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: product.id,
                shop_id: product.shop_id,
                title: product.title.clone(),
                qty: cart_item.qty,
                price_snapshot: cart_item.price_snapshot,
                status: OrderItemStatus::New,
                created_at: placed_at,
            })
            .collect();

        let total_amount = Money::total(
            items
                .iter()
                .map(OrderItem::subtotal)
                .collect::<Result<Vec<Money>, DomainError>>()?,
        )?;

        let order = Order {
            id: order_id,
            code: OrderCode::generate(placed_at, shop_index, order_id),
            buyer_id,
            shop_id,
            payment_status: PaymentStatus::Paid,
            total_amount,
            address: address.clone(),
            created_at: placed_at,
        };

        Ok(Self { order, items })
    }

    /// Returns the first item that prevents cancelling the whole order.
    pub fn blocking_item(&self) -> Option<&OrderItem> {
        self.items
            .iter()
            .find(|item| item.status.blocks_order_cancellation())
    }

    /// Returns the items still NEW or CONFIRMED.
    pub fn cancellable_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(|item| item.status.is_cancellable())
    }

    /// Returns true if every item is CANCELLED.
    pub fn is_fully_cancelled(&self) -> bool {
        self.items
            .iter()
            .all(|item| item.status == OrderItemStatus::Cancelled)
    }
}
