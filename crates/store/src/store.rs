use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, OrderItemId, ProductId, ShopId, UserId};
use domain::{
    Cart, CartItem, Order, OrderItem, OrderItemStatus, PaymentStatus, Product, Shop,
};

use crate::Result;

/// Result of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock was decremented and sold count incremented.
    Reserved { remaining: u32 },
    /// The product is active but has fewer than the requested units.
    Insufficient { available: u32 },
    /// The product is inactive.
    Inactive,
    /// No such product.
    Missing,
}

/// Result of a conditional stock increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Stock was incremented and sold count decremented.
    Released,
    /// Releasing would drive the sold count below zero; nothing was changed.
    SoldCountUnderflow { sold_count: u32 },
    /// No such product.
    Missing,
}

/// Entry point to a marketplace store.
///
/// Every operation of the order pipeline runs against exactly one
/// transaction obtained from [`MarketStore::begin`]. Work becomes visible only
/// through [`StoreTx::commit`]; dropping a transaction discards it.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// The transaction-scoped session type.
    type Tx: StoreTx;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// A transaction-scoped session over the marketplace tables.
///
/// Implementations must give each transaction serializable behaviour with
/// respect to the rows it locks or conditionally updates: stock changes are
/// single guarded updates, and `lock_*` reads hold the row until commit.
#[async_trait]
pub trait StoreTx: Send + Sized {
    // -- Shops and products --

    /// Returns the shop owned by a seller, if any.
    async fn shop_owned_by(&mut self, owner_id: UserId) -> Result<Option<Shop>>;

    /// Loads a product.
    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<Product>>;

    /// Atomically checks `is_active && stock >= qty`, then decrements stock
    /// and increments sold count by `qty`.
    async fn reserve_stock(&mut self, product_id: ProductId, qty: u32) -> Result<ReserveOutcome>;

    /// Atomically increments stock and decrements sold count by `qty`, unless
    /// the sold count would go negative.
    async fn release_stock(&mut self, product_id: ProductId, qty: u32) -> Result<ReleaseOutcome>;

    // -- Carts --

    /// Returns the buyer's cart, if one was created.
    async fn find_cart(&mut self, buyer_id: UserId) -> Result<Option<Cart>>;

    /// Returns the buyer's cart and locks it until the transaction ends.
    ///
    /// Every change to a cart's lines is made under this lock, so concurrent
    /// cart edits and checkouts of the same cart run one after another.
    async fn lock_cart(&mut self, buyer_id: UserId) -> Result<Option<Cart>>;

    /// Persists a new cart.
    async fn insert_cart(&mut self, cart: &Cart) -> Result<()>;

    /// Lists a cart's items in insertion order.
    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>>;

    /// Inserts or replaces a cart item, keyed by its id.
    ///
    /// At most one item may exist per (cart, product).
    async fn upsert_cart_item(&mut self, item: &CartItem) -> Result<()>;

    /// Deletes the given items of a cart; returns how many were removed.
    async fn delete_cart_items(&mut self, cart_id: CartId, item_ids: &[CartItemId])
    -> Result<u64>;

    // -- Orders --

    /// Persists a new order. Order codes are unique.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Persists a new order item.
    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()>;

    /// Loads an order without locking it.
    async fn get_order(&mut self, order_id: OrderId) -> Result<Option<Order>>;

    /// Loads an order and locks it until the transaction ends.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists a buyer's orders, newest first.
    async fn orders_for_buyer(&mut self, buyer_id: UserId) -> Result<Vec<Order>>;

    /// Lists an order's items in creation order.
    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Loads an order item without locking it.
    async fn get_order_item(&mut self, item_id: OrderItemId) -> Result<Option<OrderItem>>;

    /// Loads an order item and locks it until the transaction ends.
    async fn lock_order_item(&mut self, item_id: OrderItemId) -> Result<Option<OrderItem>>;

    /// Lists a shop's order items, newest first, optionally by status.
    async fn shop_order_items(
        &mut self,
        shop_id: ShopId,
        status: Option<OrderItemStatus>,
    ) -> Result<Vec<OrderItem>>;

    /// Sets an item's status only if it is currently `expected`.
    ///
    /// Returns false when the item was not in the expected status.
    async fn update_item_status(
        &mut self,
        item_id: OrderItemId,
        expected: OrderItemStatus,
        next: OrderItemStatus,
    ) -> Result<bool>;

    /// Overwrites an order's payment status.
    async fn set_payment_status(&mut self, order_id: OrderId, status: PaymentStatus)
    -> Result<()>;

    /// Returns true if the buyer has a COMPLETED item for the product.
    async fn has_completed_purchase(
        &mut self,
        buyer_id: UserId,
        product_id: ProductId,
    ) -> Result<bool>;

    /// Makes every change of this transaction visible.
    async fn commit(self) -> Result<()>;
}
