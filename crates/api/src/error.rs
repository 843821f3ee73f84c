//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use orders::MarketError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No usable caller identity.
    Unauthorized(String),
    /// The caller's role may not use the route.
    Forbidden(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Error from the order pipeline.
    Market(MarketError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Market(MarketError::Domain(err)) => domain_error_to_response(err),
            ApiError::Market(MarketError::Store(err)) => store_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message, "code": code });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, &'static str, String) {
    let status = match &err {
        DomainError::Validation(_)
        | DomainError::EmptyCart
        | DomainError::InvalidSelection { .. } => StatusCode::BAD_REQUEST,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::ProductUnavailable { .. }
        | DomainError::InsufficientStock { .. }
        | DomainError::InvalidTransition { .. }
        | DomainError::OrderNotCancellable { .. } => StatusCode::CONFLICT,
        DomainError::InternalConsistencyFault(_) => {
            tracing::error!(error = %err, "internal consistency fault");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.code(), err.to_string())
}

fn store_error_to_response(err: StoreError) -> (StatusCode, &'static str, String) {
    if err.is_retryable() {
        tracing::warn!(error = %err, "transaction conflict persisted after retries");
        return (StatusCode::CONFLICT, "CONFLICT", err.to_string());
    }
    tracing::error!(error = %err, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "STORE_ERROR",
        "internal storage error".to_string(),
    )
}

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        ApiError::Market(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Market(MarketError::Domain(err))
    }
}

#[cfg(test)]
mod tests {
    use common::ProductId;
    use domain::OrderItemStatus;

    use super::*;

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_domain_errors_map_to_statuses() {
        assert_eq!(status_of(DomainError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::Validation("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::InsufficientStock {
                product_id: ProductId::new(),
                requested: 2,
                available: 1,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::InvalidTransition {
                from: OrderItemStatus::Completed,
                to: OrderItemStatus::Cancelled,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::not_found("order", "1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::Forbidden("no".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(DomainError::InternalConsistencyFault("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_map_to_statuses() {
        assert_eq!(
            status_of(MarketError::Store(StoreError::Conflict("busy".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(MarketError::Store(StoreError::Corrupt("bad".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_identity_errors_map_to_statuses() {
        assert_eq!(
            status_of(ApiError::Unauthorized("who".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::BadRequest("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
    }
}
