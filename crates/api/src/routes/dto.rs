//! JSON request and response bodies. Field names are camelCase.

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, OrderId, OrderItemId, ProductId, ShopId};
use domain::{
    AddressSnapshot, CartItem, CartSummary, DomainError, Money, OrderItem, OrderItemStatus,
    PaymentStatus, PlacedOrder, ShippingAddress,
};
use serde::{Deserialize, Serialize};

// -- Request types --

/// Shipping address as posted by the client. Absent fields are blank and
/// rejected by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressRequest {
    pub name: String,
    pub phone: String,
    pub city: String,
    pub postal_code: String,
    pub address: String,
}

impl From<AddressRequest> for ShippingAddress {
    fn from(req: AddressRequest) -> Self {
        ShippingAddress {
            name: req.name,
            phone: req.phone,
            city: req.city,
            postal_code: req.postal_code,
            address: req.address,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    #[serde(default)]
    pub address: AddressRequest,
    pub shipping_method: Option<String>,
    pub selected_item_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemBody {
    pub product_id: String,
    pub qty: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemBody {
    pub qty: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub shop_id: ShopId,
    pub title: String,
    pub qty: u32,
    pub price_snapshot: Money,
    pub subtotal: Money,
    pub status: OrderItemStatus,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OrderItem> for OrderItemResponse {
    type Error = DomainError;

    fn try_from(item: OrderItem) -> Result<Self, Self::Error> {
        Ok(Self {
            subtotal: item.subtotal()?,
            id: item.id,
            order_id: item.order_id,
            product_id: item.product_id,
            shop_id: item.shop_id,
            title: item.title,
            qty: item.qty,
            price_snapshot: item.price_snapshot,
            status: item.status,
            created_at: item.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDetail {
    pub name: String,
    pub phone: String,
    pub city: String,
    pub postal_code: String,
    pub address: String,
    pub shipping_method: Option<String>,
}

impl From<AddressSnapshot> for AddressDetail {
    fn from(snapshot: AddressSnapshot) -> Self {
        let recipient = snapshot.recipient;
        Self {
            name: recipient.name,
            phone: recipient.phone,
            city: recipient.city,
            postal_code: recipient.postal_code,
            address: recipient.address,
            shipping_method: snapshot.shipping_method,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub code: String,
    pub shop_id: ShopId,
    pub payment_status: PaymentStatus,
    pub address_detail: AddressDetail,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl TryFrom<PlacedOrder> for OrderResponse {
    type Error = DomainError;

    fn try_from(placed: PlacedOrder) -> Result<Self, Self::Error> {
        let order = placed.order;
        Ok(Self {
            id: order.id,
            code: order.code.to_string(),
            shop_id: order.shop_id,
            payment_status: order.payment_status,
            address_detail: order.address.into(),
            total_amount: order.total_amount,
            created_at: order.created_at,
            items: convert_all(placed.items)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub count: usize,
    pub orders: Vec<OrderResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub qty: u32,
    pub price_snapshot: Money,
    pub subtotal: Money,
}

impl TryFrom<CartItem> for CartItemResponse {
    type Error = DomainError;

    fn try_from(item: CartItem) -> Result<Self, Self::Error> {
        Ok(Self {
            subtotal: item.subtotal()?,
            id: item.id,
            product_id: item.product_id,
            qty: item.qty,
            price_snapshot: item.price_snapshot,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItemResponse>,
    pub total: Money,
}

impl From<CartSummary> for CartResponse {
    fn from(summary: CartSummary) -> Self {
        Self {
            cart_id: summary.cart_id,
            items: summary
                .lines
                .into_iter()
                .map(|line| CartItemResponse {
                    id: line.item.id,
                    product_id: line.item.product_id,
                    qty: line.item.qty,
                    price_snapshot: line.item.price_snapshot,
                    subtotal: line.subtotal,
                })
                .collect(),
            total: summary.total,
        }
    }
}

/// Converts every element, failing on the first error.
pub fn convert_all<T, U>(values: Vec<T>) -> Result<Vec<U>, U::Error>
where
    U: TryFrom<T>,
{
    values.into_iter().map(U::try_from).collect()
}

#[derive(Debug, Serialize)]
pub struct ClearCartResponse {
    pub removed: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub product_id: ProductId,
    pub has_completed_purchase: bool,
}
