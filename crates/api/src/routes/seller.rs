//! Seller fulfillment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::OrderItemStatus;
use store::MarketStore;

use super::dto::{OrderItemResponse, StatusFilter, UpdateStatusBody, convert_all};
use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::identity::Seller;

/// GET /seller/order-items — items of the seller's shop, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_items<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Seller(seller_id): Seller,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<OrderItemResponse>>, ApiError> {
    let status = filter.status.as_deref().map(parse_status).transpose()?;
    let items = state.service.seller_items(seller_id, status).await?;
    Ok(Json(convert_all(items)?))
}

/// PATCH /seller/order-items/{id}/status — confirm, ship or cancel an item.
#[tracing::instrument(skip(state))]
pub async fn update_status<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Seller(seller_id): Seller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateStatusBody>,
) -> Result<Json<OrderItemResponse>, ApiError> {
    let item_id = parse_id(&id, "order item")?;
    let to = parse_status(&body.status)?;
    let item = state
        .service
        .seller_update_item(seller_id, item_id, to)
        .await?;
    Ok(Json(item.try_into()?))
}

fn parse_status(raw: &str) -> Result<OrderItemStatus, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid status: {e}")))
}
