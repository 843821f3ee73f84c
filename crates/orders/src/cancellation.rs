//! Buyer-initiated order cancellation.

use common::{OrderId, UserId};
use domain::{DomainError, OrderItem, OrderItemStatus, PaymentStatus, PlacedOrder};
use serde::Serialize;
use store::StoreTx;

use crate::error::Result;
use crate::fulfillment;

/// What a cancellation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    pub order_id: OrderId,
    pub payment_status: PaymentStatus,
    /// Items moved to CANCELLED by this call.
    pub cancelled_items: usize,
}

/// Cancels every open item of the buyer's order and refunds it.
///
/// All or nothing: one shipped or completed item rejects the whole order.
/// Repeating the call on a cancelled order succeeds with zero items.
pub async fn cancel_order<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    order_id: OrderId,
    reason: Option<&str>,
) -> Result<CancellationOutcome> {
    let order = tx
        .lock_order(order_id)
        .await?
        .filter(|order| order.buyer_id == buyer_id)
        .ok_or_else(|| DomainError::not_found("order", order_id))?;

    // Item rows are locked before deciding so a concurrent seller update
    // either lands first or waits for this transaction.
    let mut items = Vec::new();
    for listed in tx.order_items(order_id).await? {
        items.push(tx.lock_order_item(listed.id).await?.unwrap_or(listed));
    }
    let placed = PlacedOrder { order, items };

    if let Some(item) = placed.blocking_item() {
        return Err(DomainError::OrderNotCancellable {
            order_id,
            item_id: item.id,
            status: item.status,
        }
        .into());
    }
    let open: Vec<OrderItem> = placed.cancellable_items().cloned().collect();

    let cancelled_items = open.len();
    for item in open {
        fulfillment::apply(tx, item, OrderItemStatus::Cancelled).await?;
    }
    tx.set_payment_status(order_id, PaymentStatus::Refunded)
        .await?;

    tracing::info!(
        %order_id,
        cancelled_items,
        reason = reason.unwrap_or("none"),
        "order cancelled"
    );

    Ok(CancellationOutcome {
        order_id,
        payment_status: PaymentStatus::Refunded,
        cancelled_items,
    })
}
