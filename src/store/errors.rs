//! Record store errors

use thiserror::Error;
use uuid::Uuid;

/// Result type for store calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by a record store.
///
/// The query engine propagates these unchanged and never retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Unknown project: {0}")]
    UnknownProject(Uuid),

    #[error("Duplicate record: {0}")]
    Duplicate(Uuid),

    /// A write targeted a row that no longer exists
    #[error("Record missing: {0}")]
    Missing(Uuid),

    #[error("Invalid dataset: {0}")]
    Dataset(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
