//! Service-level error types.

use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors returned by the order pipeline operations.
#[derive(Debug, Error)]
pub enum MarketError {
    /// A marketplace rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl MarketError {
    /// Returns the domain error, if this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            MarketError::Domain(err) => Some(err),
            MarketError::Store(_) => None,
        }
    }

    /// Returns true if re-running the whole transaction may succeed.
    ///
    /// Domain errors are final; only storage conflicts are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MarketError::Store(err) if err.is_retryable())
    }
}

/// Convenience type alias for pipeline results.
pub type Result<T> = std::result::Result<T, MarketError>;
