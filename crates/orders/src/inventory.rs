//! Inventory ledger: stock reservation and release.
//!
//! Stock is never read, compared and written back in separate steps. Both
//! operations delegate to the store's single conditional update and only
//! translate its outcome.

use common::ProductId;
use domain::{DomainError, Product};
use store::{ReleaseOutcome, ReserveOutcome, StoreTx};

use crate::error::Result;

/// Reserves `qty` units: decrements stock and increments sold count.
///
/// Fails with `InsufficientStock` or `ProductUnavailable` without touching the
/// product. Returns the remaining stock.
pub async fn reserve<T: StoreTx>(tx: &mut T, product_id: ProductId, qty: u32) -> Result<u32> {
    match tx.reserve_stock(product_id, qty).await? {
        ReserveOutcome::Reserved { remaining } => {
            tracing::debug!(%product_id, qty, remaining, "stock reserved");
            Ok(remaining)
        }
        ReserveOutcome::Insufficient { available } => Err(DomainError::InsufficientStock {
            product_id,
            requested: qty,
            available,
        }
        .into()),
        ReserveOutcome::Inactive | ReserveOutcome::Missing => {
            Err(DomainError::ProductUnavailable { product_id }.into())
        }
    }
}

/// Releases `qty` previously reserved units back to stock.
///
/// A release the ledger cannot account for is an internal consistency fault:
/// it is logged and fails the surrounding transaction.
pub async fn release<T: StoreTx>(tx: &mut T, product_id: ProductId, qty: u32) -> Result<()> {
    match tx.release_stock(product_id, qty).await? {
        ReleaseOutcome::Released => {
            tracing::debug!(%product_id, qty, "stock released");
            Ok(())
        }
        ReleaseOutcome::SoldCountUnderflow { sold_count } => {
            tracing::error!(
                %product_id,
                qty,
                sold_count,
                "release would drive sold count negative"
            );
            Err(DomainError::InternalConsistencyFault(format!(
                "releasing {qty} units of product {product_id} exceeds sold count {sold_count}"
            ))
            .into())
        }
        ReleaseOutcome::Missing => {
            tracing::error!(%product_id, qty, "release for unknown product");
            Err(DomainError::InternalConsistencyFault(format!(
                "cannot release stock of missing product {product_id}"
            ))
            .into())
        }
    }
}

/// Read-only check that `qty` units could be reserved right now.
///
/// Returns the product as read. A missing product counts as unavailable.
pub async fn ensure_available<T: StoreTx>(
    tx: &mut T,
    product_id: ProductId,
    qty: u32,
) -> Result<Product> {
    let product = tx
        .get_product(product_id)
        .await?
        .ok_or(DomainError::ProductUnavailable { product_id })?;
    product.ensure_available(qty)?;
    Ok(product)
}
