//! Buyer cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use store::MarketStore;

use super::dto::{
    AddCartItemBody, CartItemResponse, CartResponse, ClearCartResponse, UpdateCartItemBody,
};
use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::identity::Buyer;

/// GET /cart — the buyer's cart with subtotals and total.
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
) -> Result<Json<CartResponse>, ApiError> {
    let summary = state.service.cart(buyer_id).await?;
    Ok(Json(summary.into()))
}

/// POST /cart/items — add a product, merging with an existing line.
#[tracing::instrument(skip(state))]
pub async fn add_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    ApiJson(body): ApiJson<AddCartItemBody>,
) -> Result<(StatusCode, Json<CartItemResponse>), ApiError> {
    let product_id = parse_id(&body.product_id, "product")?;
    let item = state
        .service
        .add_to_cart(buyer_id, product_id, body.qty)
        .await?;
    Ok((StatusCode::CREATED, Json(item.try_into()?)))
}

/// PATCH /cart/items/{id} — change a line's quantity.
#[tracing::instrument(skip(state))]
pub async fn update_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateCartItemBody>,
) -> Result<Json<CartItemResponse>, ApiError> {
    let item_id = parse_id(&id, "cart item")?;
    let item = state
        .service
        .update_cart_item(buyer_id, item_id, body.qty)
        .await?;
    Ok(Json(item.try_into()?))
}

/// DELETE /cart/items/{id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item_id = parse_id(&id, "cart item")?;
    state.service.remove_cart_item(buyer_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /cart — remove every line.
#[tracing::instrument(skip(state))]
pub async fn clear<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
) -> Result<Json<ClearCartResponse>, ApiError> {
    let removed = state.service.clear_cart(buyer_id).await?;
    Ok(Json(ClearCartResponse { removed }))
}
