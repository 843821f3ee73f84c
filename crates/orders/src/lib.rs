//! Order pipeline services for a multi-seller marketplace.
//!
//! Every operation runs inside one store transaction:
//! 1. Inventory ledger: guarded stock reservation and release
//! 2. Cart store: per-buyer selections with price snapshots
//! 3. Checkout: one paid order per shop, stock reserved, cart lines consumed
//! 4. Fulfillment: the order-item state machine for sellers and buyers
//! 5. Cancellation: all-or-nothing buyer cancellation with refund
//!
//! [`MarketService`] wraps these in transactions and retries storage
//! conflicts a bounded number of times.

pub mod cancellation;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod fulfillment;
pub mod inventory;
pub mod queries;
pub mod service;

pub use cancellation::CancellationOutcome;
pub use checkout::CheckoutRequest;
pub use error::{MarketError, Result};
pub use service::{DEFAULT_MAX_ATTEMPTS, MarketService, TxFuture};
