//! Order-item fulfillment state machine and payment status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DomainError;

/// Lifecycle status of a single order item.
///
/// ```text
///          seller          seller          buyer
/// NEW ──────────► CONFIRMED ──────► SHIPPED ──────► COMPLETED
///  │                  │
///  └──────────────────┴──► CANCELLED   (seller, or buyer order cancellation)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemStatus {
    /// Freshly created by checkout.
    #[default]
    New,

    /// Accepted by the seller.
    Confirmed,

    /// Handed to the carrier.
    Shipped,

    /// Receipt confirmed by the buyer (terminal state).
    Completed,

    /// Cancelled and stock released (terminal state).
    Cancelled,
}

/// Who is requesting a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    /// The seller owning the item's shop.
    Seller,
    /// The buyer owning the item's order.
    Buyer,
}

impl OrderItemStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderItemStatus; 5] = [
        OrderItemStatus::New,
        OrderItemStatus::Confirmed,
        OrderItemStatus::Shipped,
        OrderItemStatus::Completed,
        OrderItemStatus::Cancelled,
    ];

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderItemStatus::Completed | OrderItemStatus::Cancelled)
    }

    /// Returns true if the item can still be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderItemStatus::New | OrderItemStatus::Confirmed)
    }

    /// Returns true if the item prevents its whole order from being cancelled.
    pub fn blocks_order_cancellation(&self) -> bool {
        matches!(self, OrderItemStatus::Shipped | OrderItemStatus::Completed)
    }

    /// Checks `self -> to` against the transition table for `actor`.
    ///
    /// Returns the new status on success.
    pub fn transition(self, actor: Actor, to: OrderItemStatus) -> Result<Self, DomainError> {
        if is_allowed(actor, self, to) {
            Ok(to)
        } else {
            Err(DomainError::InvalidTransition { from: self, to })
        }
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderItemStatus::New => "NEW",
            OrderItemStatus::Confirmed => "CONFIRMED",
            OrderItemStatus::Shipped => "SHIPPED",
            OrderItemStatus::Completed => "COMPLETED",
            OrderItemStatus::Cancelled => "CANCELLED",
        }
    }
}

/// The transition table.
///
/// Sellers never complete an item; only the buyer confirms receipt.
pub fn is_allowed(actor: Actor, from: OrderItemStatus, to: OrderItemStatus) -> bool {
    use OrderItemStatus::*;

    match actor {
        Actor::Seller => matches!(
            (from, to),
            (New, Confirmed) | (Confirmed, Shipped) | (New, Cancelled) | (Confirmed, Cancelled)
        ),
        Actor::Buyer => matches!((from, to), (Shipped, Completed)),
    }
}

impl std::fmt::Display for OrderItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A status string that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for OrderItemStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderItemStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Order-level payment status. Payment is mocked: checkout marks orders paid
/// immediately and cancellation marks them refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Every payment status.
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
    ];

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderItemStatus::*;

    #[test]
    fn test_default_status_is_new() {
        assert_eq!(OrderItemStatus::default(), New);
    }

    #[test]
    fn test_seller_moves_from_new() {
        assert_eq!(New.transition(Actor::Seller, Confirmed), Ok(Confirmed));
        assert_eq!(New.transition(Actor::Seller, Cancelled), Ok(Cancelled));
        assert!(New.transition(Actor::Seller, Shipped).is_err());
        assert!(New.transition(Actor::Seller, Completed).is_err());
        assert!(New.transition(Actor::Seller, New).is_err());
    }

    #[test]
    fn test_seller_moves_from_confirmed() {
        assert_eq!(Confirmed.transition(Actor::Seller, Shipped), Ok(Shipped));
        assert_eq!(Confirmed.transition(Actor::Seller, Cancelled), Ok(Cancelled));
        assert!(Confirmed.transition(Actor::Seller, Completed).is_err());
    }

    #[test]
    fn test_seller_cannot_complete_or_cancel_shipped() {
        assert_eq!(
            Shipped.transition(Actor::Seller, Completed),
            Err(DomainError::InvalidTransition {
                from: Shipped,
                to: Completed
            })
        );
        assert!(Shipped.transition(Actor::Seller, Cancelled).is_err());
    }

    #[test]
    fn test_buyer_only_completes_shipped() {
        for from in OrderItemStatus::ALL {
            for to in OrderItemStatus::ALL {
                let allowed = from == Shipped && to == Completed;
                assert_eq!(is_allowed(Actor::Buyer, from, to), allowed, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in OrderItemStatus::ALL {
                assert!(from.transition(Actor::Seller, to).is_err());
                assert!(from.transition(Actor::Buyer, to).is_err());
            }
        }
    }

    #[test]
    fn test_cancellation_flags() {
        assert!(New.is_cancellable());
        assert!(Confirmed.is_cancellable());
        assert!(!Shipped.is_cancellable());
        assert!(Shipped.blocks_order_cancellation());
        assert!(Completed.blocks_order_cancellation());
        assert!(!Cancelled.blocks_order_cancellation());
    }

    #[test]
    fn test_parse_and_display() {
        for status in OrderItemStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderItemStatus>(), Ok(status));
        }
        assert_eq!("shipped".parse::<OrderItemStatus>(), Ok(Shipped));
        assert!("LOST".parse::<OrderItemStatus>().is_err());
        assert_eq!("refunded".parse::<PaymentStatus>(), Ok(PaymentStatus::Refunded));
    }

    #[test]
    fn test_serialization_uses_wire_names() {
        assert_eq!(serde_json::to_string(&Confirmed).unwrap(), "\"CONFIRMED\"");
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Paid).unwrap(),
            "\"PAID\""
        );
    }
}
