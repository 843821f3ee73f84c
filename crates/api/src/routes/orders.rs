//! Buyer order endpoints.

use std::sync::Arc;

use ::orders::CancellationOutcome;
use axum::Json;
use axum::extract::{Path, State};
use store::MarketStore;

use super::dto::{
    CancelOrderBody, OrderItemResponse, OrderResponse, PurchaseResponse, convert_all,
};
use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::identity::Buyer;

/// GET /orders — the buyer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.service.buyer_orders(buyer_id).await?;
    Ok(Json(convert_all(orders)?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, "order")?;
    let placed = state.service.buyer_order(buyer_id, order_id).await?;
    Ok(Json(placed.try_into()?))
}

/// PATCH /orders/{id}/cancel — cancel the whole order and refund it.
///
/// The body is optional.
#[tracing::instrument(skip(state, body))]
pub async fn cancel<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(id): Path<String>,
    body: Option<ApiJson<CancelOrderBody>>,
) -> Result<Json<CancellationOutcome>, ApiError> {
    let order_id = parse_id(&id, "order")?;
    let reason = body.and_then(|ApiJson(body)| body.reason);
    let outcome = state
        .service
        .cancel_order(buyer_id, order_id, reason)
        .await?;
    Ok(Json(outcome))
}

/// PATCH /order-items/{id}/complete — confirm receipt of a shipped item.
#[tracing::instrument(skip(state))]
pub async fn complete_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(id): Path<String>,
) -> Result<Json<OrderItemResponse>, ApiError> {
    let item_id = parse_id(&id, "order item")?;
    let item = state.service.buyer_complete_item(buyer_id, item_id).await?;
    Ok(Json(item.try_into()?))
}

/// GET /purchases/{productId}/completed — whether the buyer may review the
/// product.
#[tracing::instrument(skip(state))]
pub async fn completed_purchase<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(id): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let product_id = parse_id(&id, "product")?;
    let has_completed_purchase = state
        .service
        .has_completed_purchase(buyer_id, product_id)
        .await?;
    Ok(Json(PurchaseResponse {
        product_id,
        has_completed_purchase,
    }))
}
