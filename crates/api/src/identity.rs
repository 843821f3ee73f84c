//! Caller identity taken from gateway-set headers.
//!
//! An upstream gateway authenticates the caller and forwards `x-user-id` (a
//! UUID) and `x-user-role` (`buyer` or `seller`).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("buyer") {
            Some(Role::Buyer)
        } else if raw.eq_ignore_ascii_case("seller") {
            Some(Role::Seller)
        } else {
            None
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    fn from_parts(parts: &Parts) -> Result<Self, ApiError> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?
            .parse::<UserId>()
            .map_err(|e| ApiError::Unauthorized(format!("invalid {USER_ID_HEADER}: {e}")))?;
        let role = header(USER_ROLE_HEADER)
            .and_then(Role::parse)
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("missing or unknown {USER_ROLE_HEADER}"))
            })?;

        Ok(Self { user_id, role })
    }

    fn require(self, role: Role) -> Result<UserId, ApiError> {
        if self.role == role {
            Ok(self.user_id)
        } else {
            Err(ApiError::Forbidden(format!(
                "route requires the {} role",
                match role {
                    Role::Buyer => "buyer",
                    Role::Seller => "seller",
                }
            )))
        }
    }
}

/// Extracts a caller acting as a buyer.
#[derive(Debug, Clone, Copy)]
pub struct Buyer(pub UserId);

/// Extracts a caller acting as a seller.
#[derive(Debug, Clone, Copy)]
pub struct Seller(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Identity::from_parts(parts)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Buyer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Identity::from_parts(parts)?.require(Role::Buyer).map(Buyer)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Seller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Identity::from_parts(parts)?.require(Role::Seller).map(Seller)
    }
}
