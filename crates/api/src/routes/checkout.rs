//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::CartItemId;
use store::MarketStore;

use super::dto::{CheckoutBody, CheckoutResponse, OrderResponse, convert_all};
use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::identity::Buyer;

/// POST /checkout — turn the cart (or a selection of it) into one order per
/// shop.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: MarketStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let selected_item_ids = body
        .selected_item_ids
        .map(|ids| {
            ids.iter()
                .map(|id| parse_id::<CartItemId>(id, "cart item"))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let request = ::orders::CheckoutRequest {
        address: body.address.into(),
        shipping_method: body.shipping_method,
        selected_item_ids,
    };
    let placed = state.service.checkout(buyer_id, request).await?;

    let orders: Vec<OrderResponse> = convert_all(placed)?;
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            count: orders.len(),
            orders,
        }),
    ))
}
