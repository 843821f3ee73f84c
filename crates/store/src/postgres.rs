use async_trait::async_trait;
use common::{CartId, CartItemId, OrderId, OrderItemId, ProductId, ShopId, UserId};
use domain::{
    AddressSnapshot, Cart, CartItem, Money, Order, OrderCode, OrderItem, OrderItemStatus,
    PaymentStatus, Product, Shop, ShippingAddress,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{MarketStore, ReleaseOutcome, ReserveOutcome, StoreTx},
};

const ORDER_COLUMNS: &str = "id, code, buyer_id, shop_id, payment_status, total_amount, \
     recipient_name, recipient_phone, recipient_city, recipient_postal_code, \
     recipient_address, shipping_method, created_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, shop_id, title, qty, price_snapshot, status, created_at";

const CART_ITEM_COLUMNS: &str =
    "id, cart_id, product_id, qty, price_snapshot, created_at, updated_at";

/// PostgreSQL-backed marketplace store.
///
/// Transactions run at READ COMMITTED. Stock changes are guarded single-row
/// `UPDATE`s; cart, order and item work takes `FOR UPDATE` row locks, so
/// concurrent transactions cannot interleave on the rows they touch. Locks
/// are always taken cart, then order, then item.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts a shop. Stands in for the external shop-profile service.
    pub async fn insert_shop(&self, shop: &Shop) -> Result<()> {
        sqlx::query("INSERT INTO shops (id, owner_id, name) VALUES ($1, $2, $3)")
            .bind(shop.id.as_uuid())
            .bind(shop.owner_id.as_uuid())
            .bind(&shop.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a product. Stands in for the external catalog service.
    pub async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, shop_id, title, price, stock, sold_count, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.shop_id.as_uuid())
        .bind(&product.title)
        .bind(product.price.cents())
        .bind(to_db_count(product.stock)?)
        .bind(to_db_count(product.sold_count)?)
        .bind(product.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns the committed state of a product.
    pub async fn product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, shop_id, title, price, stock, sold_count, is_active FROM products WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_product).transpose()
    }
}

#[async_trait]
impl MarketStore for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTx { tx })
    }
}

/// A transaction over [`PostgresStore`].
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn shop_owned_by(&mut self, owner_id: UserId) -> Result<Option<Shop>> {
        let row = sqlx::query("SELECT id, owner_id, name FROM shops WHERE owner_id = $1")
            .bind(owner_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(Some(Shop {
                id: ShopId::from_uuid(row.try_get::<Uuid, _>("id")?),
                owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
                name: row.try_get("name")?,
            })),
            None => Ok(None),
        }
    }

    async fn get_product(&mut self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, shop_id, title, price, stock, sold_count, is_active FROM products WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(row_to_product).transpose()
    }

    async fn reserve_stock(&mut self, product_id: ProductId, qty: u32) -> Result<ReserveOutcome> {
        let qty = to_db_count(qty)?;

        // Check and decrement in one statement; the row lock it takes makes a
        // concurrent reservation wait and then re-evaluate the guard.
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock - $2, sold_count = sold_count + $2
            WHERE id = $1 AND is_active AND stock >= $2
            RETURNING stock
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(qty)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(ReserveOutcome::Reserved {
                remaining: from_db_count(remaining, "products.stock")?,
            });
        }

        let row = sqlx::query("SELECT is_active, stock FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            None => Ok(ReserveOutcome::Missing),
            Some(row) if !row.try_get::<bool, _>("is_active")? => Ok(ReserveOutcome::Inactive),
            Some(row) => Ok(ReserveOutcome::Insufficient {
                available: from_db_count(row.try_get("stock")?, "products.stock")?,
            }),
        }
    }

    async fn release_stock(&mut self, product_id: ProductId, qty: u32) -> Result<ReleaseOutcome> {
        let qty = to_db_count(qty)?;

        let released = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2, sold_count = sold_count - $2
            WHERE id = $1 AND sold_count >= $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(qty)
        .execute(&mut *self.tx)
        .await?;

        if released.rows_affected() == 1 {
            return Ok(ReleaseOutcome::Released);
        }

        let sold_count: Option<i32> =
            sqlx::query_scalar("SELECT sold_count FROM products WHERE id = $1")
                .bind(product_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        match sold_count {
            None => Ok(ReleaseOutcome::Missing),
            Some(sold_count) => Ok(ReleaseOutcome::SoldCountUnderflow {
                sold_count: from_db_count(sold_count, "products.sold_count")?,
            }),
        }
    }

    async fn find_cart(&mut self, buyer_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT id, buyer_id, created_at FROM carts WHERE buyer_id = $1")
            .bind(buyer_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(row_to_cart).transpose()
    }

    async fn lock_cart(&mut self, buyer_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query(
            "SELECT id, buyer_id, created_at FROM carts WHERE buyer_id = $1 FOR UPDATE",
        )
        .bind(buyer_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(row_to_cart).transpose()
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<()> {
        sqlx::query("INSERT INTO carts (id, buyer_id, created_at) VALUES ($1, $2, $3)")
            .bind(cart.id.as_uuid())
            .bind(cart.buyer_id.as_uuid())
            .bind(cart.created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(cart_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_cart_item).collect()
    }

    async fn upsert_cart_item(&mut self, item: &CartItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, product_id, qty, price_snapshot, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                qty = EXCLUDED.qty,
                price_snapshot = EXCLUDED.price_snapshot,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.cart_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(to_db_count(item.qty)?)
        .bind(item.price_snapshot.cents())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_cart_items(
        &mut self,
        cart_id: CartId,
        item_ids: &[CartItemId],
    ) -> Result<u64> {
        let ids: Vec<Uuid> = item_ids.iter().map(CartItemId::as_uuid).collect();
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND id = ANY($2)")
            .bind(cart_id.as_uuid())
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let recipient = &order.address.recipient;
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, code, buyer_id, shop_id, payment_status, total_amount,
                recipient_name, recipient_phone, recipient_city, recipient_postal_code,
                recipient_address, shipping_method, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.code.as_str())
        .bind(order.buyer_id.as_uuid())
        .bind(order.shop_id.as_uuid())
        .bind(order.payment_status.as_str())
        .bind(order.total_amount.cents())
        .bind(&recipient.name)
        .bind(&recipient.phone)
        .bind(&recipient.city)
        .bind(&recipient.postal_code)
        .bind(&recipient.address)
        .bind(order.address.shipping_method.as_deref())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, shop_id, title, qty, price_snapshot, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.shop_id.as_uuid())
        .bind(&item.title)
        .bind(to_db_count(item.qty)?)
        .bind(item.price_snapshot.cents())
        .bind(item.status.as_str())
        .bind(item.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn get_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(row_to_order).transpose()
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(row_to_order).transpose()
    }

    async fn orders_for_buyer(&mut self, buyer_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, code DESC"
        ))
        .bind(buyer_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn get_order_item(&mut self, item_id: OrderItemId) -> Result<Option<OrderItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE id = $1"
        ))
        .bind(item_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(row_to_order_item).transpose()
    }

    async fn lock_order_item(&mut self, item_id: OrderItemId) -> Result<Option<OrderItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE id = $1 FOR UPDATE"
        ))
        .bind(item_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(row_to_order_item).transpose()
    }

    async fn shop_order_items(
        &mut self,
        shop_id: ShopId,
        status: Option<OrderItemStatus>,
    ) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_ITEM_COLUMNS} FROM order_items
            WHERE shop_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC, id ASC
            "#
        ))
        .bind(shop_id.as_uuid())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn update_item_status(
        &mut self,
        item_id: OrderItemId,
        expected: OrderItemStatus,
        next: OrderItemStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE order_items SET status = $3 WHERE id = $1 AND status = $2")
            .bind(item_id.as_uuid())
            .bind(expected.as_str())
            .bind(next.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_payment_status(
        &mut self,
        order_id: OrderId,
        status: PaymentStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE orders SET payment_status = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn has_completed_purchase(
        &mut self,
        buyer_id: UserId,
        product_id: ProductId,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM order_items oi
                JOIN orders o ON o.id = oi.order_id
                WHERE o.buyer_id = $1 AND oi.product_id = $2 AND oi.status = 'COMPLETED'
            )
            "#,
        )
        .bind(buyer_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn to_db_count(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| StoreError::Corrupt(format!("count {value} out of range")))
}

fn from_db_count(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        shop_id: ShopId::from_uuid(row.try_get::<Uuid, _>("shop_id")?),
        title: row.try_get("title")?,
        price: Money::from_cents(row.try_get("price")?),
        stock: from_db_count(row.try_get("stock")?, "products.stock")?,
        sold_count: from_db_count(row.try_get("sold_count")?, "products.sold_count")?,
        is_active: row.try_get("is_active")?,
    })
}

fn row_to_cart(row: PgRow) -> Result<Cart> {
    Ok(Cart {
        id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
        buyer_id: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_cart_item(row: PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        qty: from_db_count(row.try_get("qty")?, "cart_items.qty")?,
        price_snapshot: Money::from_cents(row.try_get("price_snapshot")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let payment_status: String = row.try_get("payment_status")?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        code: OrderCode::from(row.try_get::<String, _>("code")?),
        buyer_id: UserId::from_uuid(row.try_get::<Uuid, _>("buyer_id")?),
        shop_id: ShopId::from_uuid(row.try_get::<Uuid, _>("shop_id")?),
        payment_status: payment_status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("orders.payment_status: {e}")))?,
        total_amount: Money::from_cents(row.try_get("total_amount")?),
        address: AddressSnapshot {
            recipient: ShippingAddress {
                name: row.try_get("recipient_name")?,
                phone: row.try_get("recipient_phone")?,
                city: row.try_get("recipient_city")?,
                postal_code: row.try_get("recipient_postal_code")?,
                address: row.try_get("recipient_address")?,
            },
            shipping_method: row.try_get("shipping_method")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
    let status: String = row.try_get("status")?;
    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        shop_id: ShopId::from_uuid(row.try_get::<Uuid, _>("shop_id")?),
        title: row.try_get("title")?,
        qty: from_db_count(row.try_get("qty")?, "order_items.qty")?,
        price_snapshot: Money::from_cents(row.try_get("price_snapshot")?),
        status: status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("order_items.status: {e}")))?,
        created_at: row.try_get("created_at")?,
    })
}
