//! Transaction-scoped storage for the marketplace order pipeline.
//!
//! - [`MarketStore`] / [`StoreTx`]: the session abstraction every operation runs in
//! - [`InMemoryStore`]: single-writer store used by tests and the default binary
//! - [`PostgresStore`]: `sqlx`-backed store with guarded updates and row locks

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTx};
pub use postgres::{PostgresStore, PostgresTx};
pub use store::{MarketStore, ReleaseOutcome, ReserveOutcome, StoreTx};
