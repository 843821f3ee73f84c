//! Order-item fulfillment state machine.
//!
//! Status changes are compare-and-set against the status the legality check
//! saw, so a concurrent change can never be silently overwritten. Cancelling
//! an item releases its stock in the same transaction.

use common::{OrderItemId, UserId};
use domain::{Actor, DomainError, OrderItem, OrderItemStatus, PaymentStatus, PlacedOrder};
use store::StoreTx;

use crate::error::Result;
use crate::inventory;

/// Applies a seller-driven transition to an item of the seller's shop.
///
/// A seller cancellation that leaves every item of the order cancelled also
/// marks the order REFUNDED.
pub async fn seller_transition<T: StoreTx>(
    tx: &mut T,
    seller_id: UserId,
    item_id: OrderItemId,
    to: OrderItemStatus,
) -> Result<OrderItem> {
    let shop = tx
        .shop_owned_by(seller_id)
        .await?
        .ok_or_else(|| DomainError::Forbidden("seller does not own a shop".to_string()))?;
    let listed = tx
        .get_order_item(item_id)
        .await?
        .ok_or_else(|| DomainError::not_found("order item", item_id))?;
    if listed.shop_id != shop.id {
        return Err(
            DomainError::Forbidden(format!("order item {item_id} belongs to another shop")).into(),
        );
    }

    // Cancelling locks the order before the item, like `cancel_order`.
    let order = if to == OrderItemStatus::Cancelled {
        Some(tx.lock_order(listed.order_id).await?.ok_or_else(|| {
            DomainError::InternalConsistencyFault(format!("order item {item_id} has no order"))
        })?)
    } else {
        None
    };

    let item = tx
        .lock_order_item(item_id)
        .await?
        .ok_or_else(|| DomainError::not_found("order item", item_id))?;
    let next = item.status.transition(Actor::Seller, to)?;
    let updated = apply(tx, item, next).await?;

    if let Some(order) = order {
        let placed = PlacedOrder {
            items: tx.order_items(order.id).await?,
            order,
        };
        if placed.is_fully_cancelled() {
            tx.set_payment_status(placed.order.id, PaymentStatus::Refunded)
                .await?;
            tracing::info!(
                order_id = %placed.order.id,
                "order fully cancelled by seller, refunded"
            );
        }
    }

    Ok(updated)
}

/// Confirms receipt of a shipped item on behalf of the order's buyer.
pub async fn buyer_complete<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    item_id: OrderItemId,
) -> Result<OrderItem> {
    let item = tx
        .lock_order_item(item_id)
        .await?
        .ok_or_else(|| DomainError::not_found("order item", item_id))?;
    let order = tx.get_order(item.order_id).await?.ok_or_else(|| {
        DomainError::InternalConsistencyFault(format!("order item {item_id} has no order"))
    })?;
    if order.buyer_id != buyer_id {
        return Err(
            DomainError::Forbidden(format!("order item {item_id} belongs to another buyer"))
                .into(),
        );
    }

    let next = item
        .status
        .transition(Actor::Buyer, OrderItemStatus::Completed)?;
    apply(tx, item, next).await
}

/// Writes an already-validated status change and its stock side effect.
///
/// Fails with `InvalidTransition` if the item no longer holds the status it
/// was validated against.
pub(crate) async fn apply<T: StoreTx>(
    tx: &mut T,
    item: OrderItem,
    next: OrderItemStatus,
) -> Result<OrderItem> {
    if !tx.update_item_status(item.id, item.status, next).await? {
        let current = tx
            .lock_order_item(item.id)
            .await?
            .map_or(item.status, |fresh| fresh.status);
        return Err(DomainError::InvalidTransition {
            from: current,
            to: next,
        }
        .into());
    }

    if next == OrderItemStatus::Cancelled {
        inventory::release(tx, item.product_id, item.qty).await?;
    }

    tracing::info!(
        item_id = %item.id,
        from = %item.status,
        to = %next,
        "order item transitioned"
    );
    Ok(OrderItem {
        status: next,
        ..item
    })
}
