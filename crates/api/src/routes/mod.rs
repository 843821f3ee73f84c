//! HTTP route handlers.

pub mod cart;
pub mod checkout;
pub mod dto;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod seller;

use std::str::FromStr;

use ::orders::MarketService;
use store::MarketStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MarketStore> {
    pub service: MarketService<S>,
}

/// Parses a typed id from a path segment.
pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what} id: {e}")))
}
