//! Checkout orchestration.
//!
//! One checkout converts a selection of cart items into one order per shop.
//! Everything below runs inside the caller's transaction with the cart locked:
//! any error leaves no orders, no stock change and an untouched cart.

use std::collections::BTreeMap;

use chrono::Utc;
use common::{CartItemId, ShopId, UserId};
use domain::{AddressSnapshot, CartItem, DomainError, PlacedOrder, Product, ShippingAddress};
use store::{StoreError, StoreTx};

use crate::error::Result;
use crate::inventory;

/// Input of a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub address: ShippingAddress,
    pub shipping_method: Option<String>,
    /// Cart items to check out; `None` means the whole cart.
    pub selected_item_ids: Option<Vec<CartItemId>>,
}

impl CheckoutRequest {
    /// Checks out the whole cart.
    pub fn whole_cart(address: ShippingAddress) -> Self {
        Self {
            address,
            shipping_method: None,
            selected_item_ids: None,
        }
    }

    /// Restricts the checkout to the given cart items.
    pub fn with_selection(mut self, ids: Vec<CartItemId>) -> Self {
        self.selected_item_ids = Some(ids);
        self
    }

    pub fn with_shipping_method(mut self, method: impl Into<String>) -> Self {
        self.shipping_method = Some(method.into());
        self
    }
}

/// Places one order per shop represented in the selection.
///
/// Orders come back sorted by shop id, which is also the order their codes
/// were numbered in.
pub async fn place_orders<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    request: &CheckoutRequest,
) -> Result<Vec<PlacedOrder>> {
    let address =
        AddressSnapshot::capture(&request.address, request.shipping_method.as_deref())?;

    let cart = tx
        .lock_cart(buyer_id)
        .await?
        .ok_or(DomainError::EmptyCart)?;
    let items = tx.cart_items(cart.id).await?;
    let selected = select_items(items, request.selected_item_ids.as_deref())?;

    let mut by_shop: BTreeMap<ShopId, Vec<(CartItem, Product)>> = BTreeMap::new();
    for item in selected {
        let product = inventory::ensure_available(tx, item.product_id, item.qty).await?;
        by_shop
            .entry(product.shop_id)
            .or_default()
            .push((item, product));
    }

    let placed_at = Utc::now();
    let mut placed = Vec::with_capacity(by_shop.len());
    for (shop_index, (shop_id, lines)) in by_shop.iter().enumerate() {
        let order =
            PlacedOrder::assemble(buyer_id, *shop_id, shop_index, &address, lines, placed_at)?;
        tx.insert_order(&order.order).await?;
        for item in &order.items {
            tx.insert_order_item(item).await?;
            inventory::reserve(tx, item.product_id, item.qty).await?;
        }
        tracing::info!(
            order_id = %order.order.id,
            code = %order.order.code,
            %shop_id,
            items = order.items.len(),
            total = %order.order.total_amount,
            "order placed"
        );
        placed.push(order);
    }

    let processed: Vec<CartItemId> = by_shop
        .values()
        .flatten()
        .map(|(item, _)| item.id)
        .collect();
    let removed = tx.delete_cart_items(cart.id, &processed).await?;
    if removed != processed.len() as u64 {
        return Err(StoreError::Conflict(format!(
            "cart {} changed during checkout: removed {removed} of {} items",
            cart.id,
            processed.len()
        ))
        .into());
    }

    Ok(placed)
}

/// Resolves the candidate cart items.
///
/// Duplicate ids in the selection are collapsed. Ids that are not in the
/// cart fail the whole checkout.
fn select_items(
    items: Vec<CartItem>,
    selection: Option<&[CartItemId]>,
) -> std::result::Result<Vec<CartItem>, DomainError> {
    let selected = match selection {
        None => items,
        Some([]) => return Err(DomainError::EmptyCart),
        Some(ids) => {
            let mut missing: Vec<CartItemId> = ids
                .iter()
                .filter(|id| !items.iter().any(|item| item.id == **id))
                .copied()
                .collect();
            if !missing.is_empty() {
                missing.sort();
                missing.dedup();
                return Err(DomainError::InvalidSelection { missing });
            }
            items
                .into_iter()
                .filter(|item| ids.contains(&item.id))
                .collect()
        }
    };

    if selected.is_empty() {
        return Err(DomainError::EmptyCart);
    }
    Ok(selected)
}
