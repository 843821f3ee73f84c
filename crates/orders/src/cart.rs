//! Cart store operations.
//!
//! Carts only hold selections; stock is checked here but reserved at checkout.
//! Every mutation holds the cart's row lock, so concurrent edits of one cart
//! are applied one after another.

use common::{CartItemId, ProductId, UserId};
use domain::{Cart, CartItem, CartSummary, DomainError, validate_quantity};
use store::StoreTx;

use crate::error::Result;

/// Adds `qty` units of a product to the buyer's cart.
///
/// Creates the cart on first use. Adding a product already in the cart merges
/// the quantities and refreshes the price snapshot.
pub async fn add_item<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    product_id: ProductId,
    qty: u32,
) -> Result<CartItem> {
    validate_quantity(qty)?;
    let product = tx
        .get_product(product_id)
        .await?
        .ok_or_else(|| DomainError::not_found("product", product_id))?;

    let cart = match tx.lock_cart(buyer_id).await? {
        Some(cart) => cart,
        None => {
            let cart = Cart::for_buyer(buyer_id);
            tx.insert_cart(&cart).await?;
            cart
        }
    };

    let existing = tx
        .cart_items(cart.id)
        .await?
        .into_iter()
        .find(|item| item.product_id == product_id);

    let item = match existing {
        Some(mut item) => {
            let merged = item.qty.saturating_add(qty);
            product.ensure_available(merged)?;
            item.reprice(&product, merged);
            item
        }
        None => {
            product.ensure_available(qty)?;
            CartItem::new(cart.id, &product, qty)
        }
    };
    item.subtotal()?;

    tx.upsert_cart_item(&item).await?;
    Ok(item)
}

/// Replaces the quantity of one of the buyer's cart items.
pub async fn update_item<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    item_id: CartItemId,
    qty: u32,
) -> Result<CartItem> {
    validate_quantity(qty)?;
    let mut item = owned_item(tx, buyer_id, item_id).await?;
    let product = tx
        .get_product(item.product_id)
        .await?
        .ok_or(DomainError::ProductUnavailable {
            product_id: item.product_id,
        })?;
    product.ensure_available(qty)?;

    item.reprice(&product, qty);
    item.subtotal()?;
    tx.upsert_cart_item(&item).await?;
    Ok(item)
}

/// Removes one of the buyer's cart items.
pub async fn remove_item<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    item_id: CartItemId,
) -> Result<()> {
    let item = owned_item(tx, buyer_id, item_id).await?;
    tx.delete_cart_items(item.cart_id, &[item.id]).await?;
    Ok(())
}

/// Empties the buyer's cart; returns the number of removed items.
pub async fn clear<T: StoreTx>(tx: &mut T, buyer_id: UserId) -> Result<u64> {
    let Some(cart) = tx.lock_cart(buyer_id).await? else {
        return Ok(0);
    };
    let ids: Vec<CartItemId> = tx
        .cart_items(cart.id)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();
    Ok(tx.delete_cart_items(cart.id, &ids).await?)
}

/// Returns the buyer's cart with subtotals. Never creates a cart.
pub async fn summary<T: StoreTx>(tx: &mut T, buyer_id: UserId) -> Result<CartSummary> {
    let Some(cart) = tx.find_cart(buyer_id).await? else {
        return Ok(CartSummary::from_items(None, Vec::new())?);
    };
    let items = tx.cart_items(cart.id).await?;
    Ok(CartSummary::from_items(Some(cart.id), items)?)
}

/// Finds one of the buyer's cart items and locks the cart.
async fn owned_item<T: StoreTx>(
    tx: &mut T,
    buyer_id: UserId,
    item_id: CartItemId,
) -> Result<CartItem> {
    let cart = tx
        .lock_cart(buyer_id)
        .await?
        .ok_or_else(|| DomainError::not_found("cart item", item_id))?;
    tx.cart_items(cart.id)
        .await?
        .into_iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| DomainError::not_found("cart item", item_id).into())
}

#[cfg(test)]
mod tests {
    use domain::{Money, Product, Shop};
    use store::{InMemoryStore, MarketStore};

    use super::*;
    use crate::MarketError;

    async fn seeded(stock: u32) -> (InMemoryStore, Product) {
        let store = InMemoryStore::new();
        let shop = Shop::new(UserId::new(), "Shop");
        let product = Product::new(shop.id, "Mug", Money::from_cents(800), stock);
        store.seed_shop(shop).await;
        store.seed_product(product.clone()).await;
        (store, product)
    }

    #[tokio::test]
    async fn test_add_merges_existing_line() {
        let (store, product) = seeded(5).await;
        let buyer = UserId::new();
        let mut tx = store.begin().await.unwrap();

        let first = add_item(&mut tx, buyer, product.id, 2).await.unwrap();
        let second = add_item(&mut tx, buyer, product.id, 1).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.qty, 3);
        let cart = summary(&mut tx, buyer).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.total, Money::from_cents(2400));
    }

    #[tokio::test]
    async fn test_add_rejects_merged_quantity_over_stock() {
        let (store, product) = seeded(3).await;
        let buyer = UserId::new();
        let mut tx = store.begin().await.unwrap();

        add_item(&mut tx, buyer, product.id, 2).await.unwrap();
        let err = add_item(&mut tx, buyer, product.id, 2).await.unwrap_err();

        assert!(matches!(
            err,
            MarketError::Domain(DomainError::InsufficientStock { requested: 4, available: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_zero_and_unknown_product() {
        let (store, product) = seeded(3).await;
        let buyer = UserId::new();
        let mut tx = store.begin().await.unwrap();

        let zero = add_item(&mut tx, buyer, product.id, 0).await.unwrap_err();
        assert!(matches!(zero, MarketError::Domain(DomainError::Validation(_))));

        let unknown = add_item(&mut tx, buyer, ProductId::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            unknown,
            MarketError::Domain(DomainError::NotFound { entity: "product", .. })
        ));
    }

    #[tokio::test]
    async fn test_foreign_item_is_not_found() {
        let (store, product) = seeded(3).await;
        let owner = UserId::new();
        let mut tx = store.begin().await.unwrap();

        let item = add_item(&mut tx, owner, product.id, 1).await.unwrap();
        let err = update_item(&mut tx, UserId::new(), item.id, 2)
            .await
            .unwrap_err();

        assert!(matches!(err, MarketError::Domain(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_add_rejects_overflowing_subtotal() {
        let store = InMemoryStore::new();
        let shop = Shop::new(UserId::new(), "Vault");
        let product = Product::new(shop.id, "Bullion", Money::from_cents(i64::MAX / 2), 10);
        store.seed_shop(shop).await;
        store.seed_product(product.clone()).await;
        let buyer = UserId::new();
        let mut tx = store.begin().await.unwrap();

        add_item(&mut tx, buyer, product.id, 1).await.unwrap();
        let err = add_item(&mut tx, buyer, product.id, 2).await.unwrap_err();

        assert!(matches!(err, MarketError::Domain(DomainError::Validation(_))));
        assert_eq!(summary(&mut tx, buyer).await.unwrap().lines[0].item.qty, 1);
    }

    #[tokio::test]
    async fn test_summary_of_missing_cart_is_empty() {
        let (store, _) = seeded(1).await;
        let mut tx = store.begin().await.unwrap();

        let cart = summary(&mut tx, UserId::new()).await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.cart_id, None);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let (store, product) = seeded(3).await;
        let buyer = UserId::new();
        let mut tx = store.begin().await.unwrap();

        let item = add_item(&mut tx, buyer, product.id, 1).await.unwrap();
        remove_item(&mut tx, buyer, item.id).await.unwrap();
        assert!(summary(&mut tx, buyer).await.unwrap().is_empty());

        add_item(&mut tx, buyer, product.id, 1).await.unwrap();
        assert_eq!(clear(&mut tx, buyer).await.unwrap(), 1);
        assert_eq!(clear(&mut tx, buyer).await.unwrap(), 0);
    }
}
