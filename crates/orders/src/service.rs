//! Transactional facade over the order pipeline.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use common::{CartItemId, OrderId, OrderItemId, ProductId, UserId};
use domain::{CartItem, CartSummary, OrderItem, OrderItemStatus, PlacedOrder};
use store::{MarketStore, StoreTx};

use crate::cancellation::{self, CancellationOutcome};
use crate::cart;
use crate::checkout::{self, CheckoutRequest};
use crate::error::{MarketError, Result};
use crate::fulfillment;
use crate::queries;

/// Default number of attempts for a transaction that hits a storage conflict.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Future returned by a unit of work run inside a transaction.
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 't>>;

/// Runs every pipeline operation in its own store transaction.
///
/// Work either commits as a whole or is discarded. Storage conflicts (lock
/// timeouts, serialization failures, lost uniqueness races) rerun the whole
/// unit of work up to `max_attempts` times; domain errors are returned as is.
pub struct MarketService<S: MarketStore> {
    store: S,
    max_attempts: u32,
}

impl<S: MarketStore> MarketService<S> {
    /// Creates a service with the default retry budget.
    pub fn new(store: S) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_ATTEMPTS)
    }

    /// Creates a service that tries each transaction at most `max_attempts`
    /// times (at least once).
    pub fn with_max_attempts(store: S, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs `work` in a fresh transaction and commits it.
    async fn transact<T, F>(&self, operation: &'static str, work: F) -> Result<T>
    where
        T: Send,
        F: for<'t> Fn(&'t mut S::Tx) -> TxFuture<'t, T> + Send + Sync,
    {
        let mut attempt = 1;
        loop {
            let mut tx = self.store.begin().await?;
            let result = work(&mut tx).await;
            let outcome = match result {
                Ok(value) => tx.commit().await.map(|()| value).map_err(MarketError::from),
                Err(err) => Err(err),
            };

            match outcome {
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    metrics::counter!("store_tx_retries_total", "operation" => operation)
                        .increment(1);
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %err,
                        "transaction conflict, retrying"
                    );
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    // -- Cart --

    /// Adds a product to the buyer's cart.
    #[tracing::instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        buyer_id: UserId,
        product_id: ProductId,
        qty: u32,
    ) -> Result<CartItem> {
        self.transact("add_to_cart", move |tx| {
            Box::pin(cart::add_item(tx, buyer_id, product_id, qty))
        })
        .await
    }

    /// Changes the quantity of a cart item.
    #[tracing::instrument(skip(self))]
    pub async fn update_cart_item(
        &self,
        buyer_id: UserId,
        item_id: CartItemId,
        qty: u32,
    ) -> Result<CartItem> {
        self.transact("update_cart_item", move |tx| {
            Box::pin(cart::update_item(tx, buyer_id, item_id, qty))
        })
        .await
    }

    /// Removes a cart item.
    #[tracing::instrument(skip(self))]
    pub async fn remove_cart_item(&self, buyer_id: UserId, item_id: CartItemId) -> Result<()> {
        self.transact("remove_cart_item", move |tx| {
            Box::pin(cart::remove_item(tx, buyer_id, item_id))
        })
        .await
    }

    /// Empties the buyer's cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, buyer_id: UserId) -> Result<u64> {
        self.transact("clear_cart", move |tx| Box::pin(cart::clear(tx, buyer_id)))
            .await
    }

    /// Returns the buyer's cart.
    #[tracing::instrument(skip(self))]
    pub async fn cart(&self, buyer_id: UserId) -> Result<CartSummary> {
        self.transact("cart", move |tx| Box::pin(cart::summary(tx, buyer_id)))
            .await
    }

    // -- Checkout --

    /// Converts the buyer's cart, or a selection of it, into one paid order
    /// per shop.
    #[tracing::instrument(skip(self, request))]
    pub async fn checkout(
        &self,
        buyer_id: UserId,
        request: CheckoutRequest,
    ) -> Result<Vec<PlacedOrder>> {
        let start = Instant::now();
        let result = self
            .transact("checkout", |tx| {
                let request = request.clone();
                Box::pin(async move { checkout::place_orders(tx, buyer_id, &request).await })
            })
            .await;
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(orders) => {
                metrics::counter!("checkout_orders_created_total").increment(orders.len() as u64);
                tracing::info!(orders = orders.len(), "checkout completed");
            }
            Err(err) => {
                metrics::counter!("checkout_failures_total", "reason" => error_code(err))
                    .increment(1);
                tracing::info!(error = %err, "checkout rejected");
            }
        }
        result
    }

    // -- Fulfillment --

    /// Moves an item of the seller's shop to `to`.
    #[tracing::instrument(skip(self))]
    pub async fn seller_update_item(
        &self,
        seller_id: UserId,
        item_id: OrderItemId,
        to: OrderItemStatus,
    ) -> Result<OrderItem> {
        let item = self
            .transact("seller_update_item", move |tx| {
                Box::pin(fulfillment::seller_transition(tx, seller_id, item_id, to))
            })
            .await?;
        metrics::counter!("order_item_transitions_total", "to" => item.status.as_str())
            .increment(1);
        Ok(item)
    }

    /// Confirms receipt of a shipped item.
    #[tracing::instrument(skip(self))]
    pub async fn buyer_complete_item(
        &self,
        buyer_id: UserId,
        item_id: OrderItemId,
    ) -> Result<OrderItem> {
        let item = self
            .transact("buyer_complete_item", move |tx| {
                Box::pin(fulfillment::buyer_complete(tx, buyer_id, item_id))
            })
            .await?;
        metrics::counter!("order_item_transitions_total", "to" => item.status.as_str())
            .increment(1);
        Ok(item)
    }

    // -- Cancellation --

    /// Cancels the buyer's order as a whole and refunds it.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        buyer_id: UserId,
        order_id: OrderId,
        reason: Option<String>,
    ) -> Result<CancellationOutcome> {
        let outcome = self
            .transact("cancel_order", |tx| {
                let reason = reason.clone();
                Box::pin(async move {
                    cancellation::cancel_order(tx, buyer_id, order_id, reason.as_deref()).await
                })
            })
            .await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        Ok(outcome)
    }

    // -- Queries --

    /// Lists the buyer's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn buyer_orders(&self, buyer_id: UserId) -> Result<Vec<PlacedOrder>> {
        self.transact("buyer_orders", move |tx| {
            Box::pin(queries::buyer_orders(tx, buyer_id))
        })
        .await
    }

    /// Loads one of the buyer's orders.
    #[tracing::instrument(skip(self))]
    pub async fn buyer_order(&self, buyer_id: UserId, order_id: OrderId) -> Result<PlacedOrder> {
        self.transact("buyer_order", move |tx| {
            Box::pin(queries::buyer_order(tx, buyer_id, order_id))
        })
        .await
    }

    /// Lists the order items of the seller's shop.
    #[tracing::instrument(skip(self))]
    pub async fn seller_items(
        &self,
        seller_id: UserId,
        status: Option<OrderItemStatus>,
    ) -> Result<Vec<OrderItem>> {
        self.transact("seller_items", move |tx| {
            Box::pin(queries::seller_items(tx, seller_id, status))
        })
        .await
    }

    /// True if the buyer has received the product at least once.
    #[tracing::instrument(skip(self))]
    pub async fn has_completed_purchase(
        &self,
        buyer_id: UserId,
        product_id: ProductId,
    ) -> Result<bool> {
        self.transact("has_completed_purchase", move |tx| {
            Box::pin(queries::has_completed_purchase(tx, buyer_id, product_id))
        })
        .await
    }
}

fn error_code(err: &MarketError) -> &'static str {
    match err {
        MarketError::Domain(err) => err.code(),
        MarketError::Store(_) => "STORE",
    }
}
