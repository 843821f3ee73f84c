use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, OrderItemId, ProductId, ShopId, UserId};
use domain::{
    Cart, CartItem, Order, OrderItem, OrderItemStatus, PaymentStatus, Product, Shop,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{MarketStore, ReleaseOutcome, ReserveOutcome, StoreTx},
};

#[derive(Debug, Clone, Default)]
struct MarketState {
    shops: HashMap<ShopId, Shop>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
}

/// In-memory marketplace store.
///
/// Transactions are fully serialized: [`InMemoryStore::begin`] takes the
/// store-wide lock. The first write copies the state into a working copy,
/// which replaces the shared state on commit; read-only transactions never
/// copy. Dropping the transaction releases the lock and throws the copy away.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MarketState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shop. Stands in for the external shop-profile service.
    pub async fn seed_shop(&self, shop: Shop) {
        self.state.lock().await.shops.insert(shop.id, shop);
    }

    /// Registers a product. Stands in for the external catalog service.
    pub async fn seed_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    /// Returns the committed state of a product.
    pub async fn product(&self, product_id: ProductId) -> Option<Product> {
        self.state.lock().await.products.get(&product_id).cloned()
    }

    /// Returns the total number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the total number of committed order items.
    pub async fn order_item_count(&self) -> usize {
        self.state.lock().await.order_items.len()
    }
}

#[async_trait]
impl MarketStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        Ok(InMemoryTx {
            guard,
            working: None,
        })
    }
}

/// A transaction over [`InMemoryStore`].
pub struct InMemoryTx {
    guard: OwnedMutexGuard<MarketState>,
    working: Option<MarketState>,
}

impl InMemoryTx {
    fn state(&self) -> &MarketState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    /// Copies the committed state on the first write of the transaction.
    fn state_mut(&mut self) -> &mut MarketState {
        self.working.get_or_insert_with(|| self.guard.clone())
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn shop_owned_by(&mut self, owner_id: UserId) -> Result<Option<Shop>> {
        Ok(self
            .state()
            .shops
            .values()
            .find(|shop| shop.owner_id == owner_id)
            .cloned())
    }

    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state().products.get(&product_id).cloned())
    }

    async fn reserve_stock(&mut self, product_id: ProductId, qty: u32) -> Result<ReserveOutcome> {
        let Some(product) = self.state_mut().products.get_mut(&product_id) else {
            return Ok(ReserveOutcome::Missing);
        };
        if !product.is_active {
            return Ok(ReserveOutcome::Inactive);
        }
        if product.stock < qty {
            return Ok(ReserveOutcome::Insufficient {
                available: product.stock,
            });
        }
        product.stock -= qty;
        product.sold_count += qty;
        Ok(ReserveOutcome::Reserved {
            remaining: product.stock,
        })
    }

    async fn release_stock(&mut self, product_id: ProductId, qty: u32) -> Result<ReleaseOutcome> {
        let Some(product) = self.state_mut().products.get_mut(&product_id) else {
            return Ok(ReleaseOutcome::Missing);
        };
        if product.sold_count < qty {
            return Ok(ReleaseOutcome::SoldCountUnderflow {
                sold_count: product.sold_count,
            });
        }
        product.sold_count -= qty;
        product.stock += qty;
        Ok(ReleaseOutcome::Released)
    }

    async fn find_cart(&mut self, buyer_id: UserId) -> Result<Option<Cart>> {
        Ok(self
            .state()
            .carts
            .values()
            .find(|cart| cart.buyer_id == buyer_id)
            .cloned())
    }

    async fn lock_cart(&mut self, buyer_id: UserId) -> Result<Option<Cart>> {
        self.find_cart(buyer_id).await
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<()> {
        if self
            .state()
            .carts
            .values()
            .any(|existing| existing.buyer_id == cart.buyer_id)
        {
            return Err(StoreError::Conflict(format!(
                "buyer {} already has a cart",
                cart.buyer_id
            )));
        }
        self.state_mut().carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>> {
        Ok(self
            .state()
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn upsert_cart_item(&mut self, item: &CartItem) -> Result<()> {
        let items = &mut self.state_mut().cart_items;
        if let Some(existing) = items.iter_mut().find(|existing| existing.id == item.id) {
            *existing = item.clone();
            return Ok(());
        }
        if items
            .iter()
            .any(|existing| existing.cart_id == item.cart_id && existing.product_id == item.product_id)
        {
            return Err(StoreError::Conflict(format!(
                "cart {} already holds product {}",
                item.cart_id, item.product_id
            )));
        }
        items.push(item.clone());
        Ok(())
    }

    async fn delete_cart_items(
        &mut self,
        cart_id: CartId,
        item_ids: &[CartItemId],
    ) -> Result<u64> {
        let items = &mut self.state_mut().cart_items;
        let before = items.len();
        items.retain(|item| !(item.cart_id == cart_id && item_ids.contains(&item.id)));
        Ok((before - items.len()) as u64)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self
            .state()
            .orders
            .iter()
            .any(|existing| existing.id == order.id || existing.code == order.code)
        {
            return Err(StoreError::Conflict(format!(
                "order code {} already exists",
                order.code
            )));
        }
        self.state_mut().orders.push(order.clone());
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
        self.state_mut().order_items.push(item.clone());
        Ok(())
    }

    async fn get_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .state()
            .orders
            .iter()
            .find(|order| order.id == order_id)
            .cloned())
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        // the whole store is already locked by this transaction
        self.get_order(order_id).await
    }

    async fn orders_for_buyer(&mut self, buyer_id: UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .state()
            .orders
            .iter()
            .filter(|order| order.buyer_id == buyer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        Ok(self
            .state()
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn get_order_item(&mut self, item_id: OrderItemId) -> Result<Option<OrderItem>> {
        Ok(self
            .state()
            .order_items
            .iter()
            .find(|item| item.id == item_id)
            .cloned())
    }

    async fn lock_order_item(&mut self, item_id: OrderItemId) -> Result<Option<OrderItem>> {
        self.get_order_item(item_id).await
    }

    async fn shop_order_items(
        &mut self,
        shop_id: ShopId,
        status: Option<OrderItemStatus>,
    ) -> Result<Vec<OrderItem>> {
        let mut items: Vec<OrderItem> = self
            .state()
            .order_items
            .iter()
            .filter(|item| item.shop_id == shop_id)
            .filter(|item| status.is_none_or(|wanted| item.status == wanted))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn update_item_status(
        &mut self,
        item_id: OrderItemId,
        expected: OrderItemStatus,
        next: OrderItemStatus,
    ) -> Result<bool> {
        match self
            .state_mut()
            .order_items
            .iter_mut()
            .find(|item| item.id == item_id && item.status == expected)
        {
            Some(item) => {
                item.status = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_payment_status(
        &mut self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<()> {
        if let Some(order) = self
            .state_mut()
            .orders
            .iter_mut()
            .find(|order| order.id == order_id)
        {
            order.payment_status = status;
        }
        Ok(())
    }

    async fn has_completed_purchase(
        &mut self,
        buyer_id: UserId,
        product_id: ProductId,
    ) -> Result<bool> {
        let state = self.state();
        Ok(state.order_items.iter().any(|item| {
            item.product_id == product_id
                && item.status == OrderItemStatus::Completed
                && state
                    .orders
                    .iter()
                    .any(|order| order.id == item.order_id && order.buyer_id == buyer_id)
        }))
    }

    async fn commit(self) -> Result<()> {
        let InMemoryTx { mut guard, working } = self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }
}
