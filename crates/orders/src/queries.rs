//! Read-only views over placed orders.

use common::{OrderId, ProductId, UserId};
use domain::{DomainError, OrderItem, OrderItemStatus, PlacedOrder};
use store::StoreTx;

use crate::error::Result;

/// Lists the buyer's orders with their items, newest first.
pub async fn buyer_orders<T: StoreTx>(tx: &mut T, buyer_id: UserId) -> Result<Vec<PlacedOrder>> {
    let orders = tx.orders_for_buyer(buyer_id).await?;
    let mut placed = Vec::with_capacity(orders.len());
    for order in orders {
        let items = tx.order_items(order.id).await?;
        placed.push(PlacedOrder { order, items });
    }
    Ok(placed)
}

/// Loads one of the buyer's orders. Other buyers' orders are not found.
pub async fn buyer_order<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    order_id: OrderId,
) -> Result<PlacedOrder> {
    let order = tx
        .get_order(order_id)
        .await?
        .filter(|order| order.buyer_id == buyer_id)
        .ok_or_else(|| DomainError::not_found("order", order_id))?;
    let items = tx.order_items(order.id).await?;
    Ok(PlacedOrder { order, items })
}

/// Lists the order items of the seller's shop, optionally by status.
pub async fn seller_items<T: StoreTx>(
    tx: &mut T,
    seller_id: UserId,
    status: Option<OrderItemStatus>,
) -> Result<Vec<OrderItem>> {
    let shop = tx
        .shop_owned_by(seller_id)
        .await?
        .ok_or_else(|| DomainError::Forbidden("seller does not own a shop".to_string()))?;
    Ok(tx.shop_order_items(shop.id, status).await?)
}

/// True if the buyer has a COMPLETED item for the product.
pub async fn has_completed_purchase<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    product_id: ProductId,
) -> Result<bool> {
    Ok(tx.has_completed_purchase(buyer_id, product_id).await?)
}
