//! Errors the store backend can raise. These always map to
//! [`gisaima_utils::GisaimaError::Internal`] at the call site — a store
//! failure is never a domain-level `failed-precondition`.

use thiserror::Error;

/// A failure reading from or committing to the backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend is unreachable or returned an unexpected failure.
    #[error("store backend unavailable: {0}")]
    Backend(String),
    /// A `transact` closure kept asking to retry past the retry budget.
    #[error("transaction exceeded retry budget at {path}")]
    TransactionExhausted {
        /// The root path the transaction was attempted against.
        path: String,
    },
}
