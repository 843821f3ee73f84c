//! Integration tests for the API server.

use std::sync::OnceLock;

use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::UserId;
use domain::{Money, Product, Shop};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, InMemoryStore) {
    let store = InMemoryStore::new();
    let state = api::create_state(store.clone(), &Config::default());
    (api::create_app(state, get_metrics_handle()), store)
}

#[derive(Clone, Copy)]
enum As {
    Anonymous,
    Buyer(UserId),
    Seller(UserId),
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    caller: As,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    match caller {
        As::Anonymous => {}
        As::Buyer(id) => {
            builder = builder
                .header("x-user-id", id.to_string())
                .header("x-user-role", "buyer");
        }
        As::Seller(id) => {
            builder = builder
                .header("x-user-id", id.to_string())
                .header("x-user-role", "seller");
        }
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn seed(store: &InMemoryStore, price_cents: i64, stock: u32) -> (UserId, Product) {
    let seller = UserId::new();
    let shop = Shop::new(seller, "Test Shop");
    let product = Product::new(shop.id, "Widget", Money::from_cents(price_cents), stock);
    store.seed_shop(shop).await;
    store.seed_product(product.clone()).await;
    (seller, product)
}

fn address() -> Value {
    json!({
        "name": "Ada Lovelace",
        "phone": "555-0100",
        "city": "London",
        "postalCode": "N1 9GU",
        "address": "12 St James's Square"
    })
}

/// Adds the product to a fresh buyer's cart and checks out; returns the
/// buyer and the single created order.
async fn place_order(app: &axum::Router, product: &Product, qty: u32) -> (UserId, Value) {
    let buyer = UserId::new();
    let (status, _) = send(
        app,
        "POST",
        "/cart/items",
        As::Buyer(buyer),
        Some(json!({ "productId": product.id.to_string(), "qty": qty })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/checkout",
        As::Buyer(buyer),
        Some(json!({ "address": address() })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (buyer, body["orders"][0].clone())
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let (status, body) = send(&app, "GET", "/health", As::Anonymous, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_identity_is_required() {
    let (app, _) = setup();

    let (status, body) = send(&app, "GET", "/cart", As::Anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = send(&app, "GET", "/cart", As::Seller(UserId::new()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_cart_lifecycle() {
    let (app, store) = setup();
    let (_, product) = seed(&store, 250, 10).await;
    let buyer = As::Buyer(UserId::new());

    let (status, body) = send(&app, "GET", "/cart", buyer, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartId"], Value::Null);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);

    let add = json!({ "productId": product.id.to_string(), "qty": 2 });
    let (status, item) = send(&app, "POST", "/cart/items", buyer, Some(add.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let item_id = item["id"].as_str().unwrap().to_string();

    let (_, merged) = send(&app, "POST", "/cart/items", buyer, Some(add)).await;
    assert_eq!(merged["id"], item_id.as_str());
    assert_eq!(merged["qty"], 4);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/cart/items/{item_id}"),
        buyer,
        Some(json!({ "qty": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["subtotal"], 750);

    let (_, cart) = send(&app, "GET", "/cart", buyer, None).await;
    assert_eq!(cart["total"], 750);

    let (status, _) = send(&app, "DELETE", &format!("/cart/items/{item_id}"), buyer, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", &format!("/cart/items/{item_id}"), buyer, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "DELETE", "/cart", buyer, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 0);
}

#[tokio::test]
async fn test_cart_rejects_overdraw_and_zero_quantity() {
    let (app, store) = setup();
    let (_, product) = seed(&store, 100, 1).await;
    let buyer = As::Buyer(UserId::new());

    let (status, body) = send(
        &app,
        "POST",
        "/cart/items",
        buyer,
        Some(json!({ "productId": product.id.to_string(), "qty": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (status, body) = send(
        &app,
        "POST",
        "/cart/items",
        buyer,
        Some(json!({ "productId": product.id.to_string(), "qty": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let (app, store) = setup();
    let (_, product) = seed(&store, 100, 5).await;
    let buyer = As::Buyer(UserId::new());

    for body in [
        json!({ "productId": product.id.to_string(), "qty": -1 }),
        json!({ "productId": product.id.to_string(), "qty": "two" }),
        json!({ "qty": 1 }),
    ] {
        let (status, body) = send(&app, "POST", "/cart/items", buyer, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    let (status, body) = send(&app, "POST", "/checkout", buyer, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_checkout_creates_paid_orders() {
    let (app, store) = setup();
    let (_, cheap) = seed(&store, 100, 5).await;
    let (_, dear) = seed(&store, 200, 5).await;
    let buyer = As::Buyer(UserId::new());

    for product in [&cheap, &dear] {
        send(
            &app,
            "POST",
            "/cart/items",
            buyer,
            Some(json!({ "productId": product.id.to_string(), "qty": 1 })),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        "POST",
        "/checkout",
        buyer,
        Some(json!({ "address": address(), "shippingMethod": "express" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["count"], 2);
    let mut totals: Vec<i64> = body["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|order| order["totalAmount"].as_i64().unwrap())
        .collect();
    totals.sort();
    assert_eq!(totals, vec![100, 200]);

    let order = &body["orders"][0];
    assert_eq!(order["paymentStatus"], "PAID");
    assert!(order["code"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["addressDetail"]["city"], "London");
    assert_eq!(order["addressDetail"]["shippingMethod"], "express");
    assert_eq!(order["items"][0]["status"], "NEW");

    let (_, cart) = send(&app, "GET", "/cart", buyer, None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
    assert_eq!(store.product(cheap.id).await.unwrap().stock, 4);
    assert_eq!(store.product(dear.id).await.unwrap().stock, 4);

    let (status, listed) = send(&app, "GET", "/orders", buyer, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_checkout_errors() {
    let (app, store) = setup();
    let (_, product) = seed(&store, 100, 2).await;
    let buyer_id = UserId::new();
    let buyer = As::Buyer(buyer_id);

    let (status, body) = send(
        &app,
        "POST",
        "/checkout",
        buyer,
        Some(json!({ "address": address() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMPTY_CART");

    send(
        &app,
        "POST",
        "/cart/items",
        buyer,
        Some(json!({ "productId": product.id.to_string(), "qty": 2 })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/checkout",
        buyer,
        Some(json!({ "address": { "name": "Ada" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION");

    let (status, body) = send(
        &app,
        "POST",
        "/checkout",
        buyer,
        Some(json!({
            "address": address(),
            "selectedItemIds": [UserId::new().to_string()]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SELECTION");

    // Someone else takes one unit first.
    place_order(&app, &product, 1).await;

    let (status, body) = send(
        &app,
        "POST",
        "/checkout",
        buyer,
        Some(json!({ "address": address() })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert!(body["error"].as_str().unwrap().contains(&product.id.to_string()));
    assert_eq!(store.order_count().await, 1);
}

#[tokio::test]
async fn test_fulfillment_through_completion() {
    let (app, store) = setup();
    let (seller, product) = seed(&store, 500, 3).await;
    let (buyer, order) = place_order(&app, &product, 1).await;
    let item_id = order["items"][0]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/seller/order-items/{item_id}/status");

    for next in ["CONFIRMED", "SHIPPED"] {
        let (status, item) = send(
            &app,
            "PATCH",
            &status_uri,
            As::Seller(seller),
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(item["status"], next);
    }

    let (status, body) = send(
        &app,
        "PATCH",
        &status_uri,
        As::Seller(seller),
        Some(json!({ "status": "COMPLETED" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, item) = send(
        &app,
        "PATCH",
        &format!("/order-items/{item_id}/complete"),
        As::Buyer(buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["status"], "COMPLETED");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/purchases/{}/completed", product.id),
        As::Buyer(buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasCompletedPurchase"], true);
}

#[tokio::test]
async fn test_seller_routes_enforce_ownership_and_input() {
    let (app, store) = setup();
    let (seller, product) = seed(&store, 500, 3).await;
    let (rival, _) = seed(&store, 500, 3).await;
    let (_, order) = place_order(&app, &product, 1).await;
    let item_id = order["items"][0]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/seller/order-items/{item_id}/status");

    let (status, _) = send(
        &app,
        "PATCH",
        &status_uri,
        As::Seller(rival),
        Some(json!({ "status": "CONFIRMED" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "PATCH",
        &status_uri,
        As::Seller(seller),
        Some(json!({ "status": "LOST" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, items) = send(
        &app,
        "GET",
        "/seller/order-items?status=new",
        As::Seller(seller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "GET",
        "/seller/order-items",
        As::Seller(UserId::new()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_cancel_order_refunds_and_is_idempotent() {
    let (app, store) = setup();
    let (seller, product) = seed(&store, 300, 4).await;
    let (buyer, order) = place_order(&app, &product, 2).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let item_id = order["items"][0]["id"].as_str().unwrap().to_string();

    send(
        &app,
        "PATCH",
        &format!("/seller/order-items/{item_id}/status"),
        As::Seller(seller),
        Some(json!({ "status": "CONFIRMED" })),
    )
    .await;

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/cancel"),
        As::Buyer(buyer),
        Some(json!({ "reason": "ordered by mistake" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["orderId"], order_id.as_str());
    assert_eq!(body["paymentStatus"], "REFUNDED");
    assert_eq!(body["cancelledItems"], 1);
    let stored = store.product(product.id).await.unwrap();
    assert_eq!((stored.stock, stored.sold_count), (4, 0));

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/cancel"),
        As::Buyer(buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelledItems"], 0);

    let (_, fetched) = send(
        &app,
        "GET",
        &format!("/orders/{order_id}"),
        As::Buyer(buyer),
        None,
    )
    .await;
    assert_eq!(fetched["items"][0]["status"], "CANCELLED");
}

#[tokio::test]
async fn test_cancel_rejected_once_shipped() {
    let (app, store) = setup();
    let (seller, product) = seed(&store, 300, 4).await;
    let (buyer, order) = place_order(&app, &product, 1).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    let item_id = order["items"][0]["id"].as_str().unwrap().to_string();

    for next in ["CONFIRMED", "SHIPPED"] {
        send(
            &app,
            "PATCH",
            &format!("/seller/order-items/{item_id}/status"),
            As::Seller(seller),
            Some(json!({ "status": next })),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/orders/{order_id}/cancel"),
        As::Buyer(buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ORDER_NOT_CANCELLABLE");
    assert_eq!(store.product(product.id).await.unwrap().stock, 3);
}

#[tokio::test]
async fn test_orders_are_private_and_ids_validated() {
    let (app, store) = setup();
    let (_, product) = seed(&store, 300, 4).await;
    let (_, order) = place_order(&app, &product, 1).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "GET",
        &format!("/orders/{order_id}"),
        As::Buyer(UserId::new()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(
        &app,
        "GET",
        "/orders/not-a-uuid",
        As::Buyer(UserId::new()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid order id"));
}
