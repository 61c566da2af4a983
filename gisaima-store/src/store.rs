//! The `Store` trait: `read`, `commit`, and `transact`, the three primitives
//! every command handler and the tick engine are built from (see spec §4.2).

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;

use crate::error::StoreError;
use crate::path::Path;

/// A stored value. A thin alias over `serde_json::Value` so entity records
/// can be serialized generically without the store knowing their shape.
pub type Value = JsonValue;

/// A staged set of writes: `None` means delete, `Some(v)` means set.
pub type Update = BTreeMap<Path, Option<Value>>;

/// What a `transact` closure wants to happen to the value it was handed.
pub enum TransactionOutcome {
    /// Commit `next` as the new value at the transaction's root path.
    Commit(Value),
    /// Delete the value at the transaction's root path.
    Delete,
    /// Give up without writing anything; the caller sees this as success
    /// (the same no-op semantics a production optimistic-transaction API
    /// gives a closure that decides not to change anything).
    Abort,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Maximum number of CAS retries a `transact` call will attempt before
/// surfacing [`StoreError::TransactionExhausted`].
pub const MAX_TRANSACT_RETRIES: u32 = 32;

/// A hierarchical key-value store with atomic multi-path commit and
/// single-path optimistic transactions.
///
/// Object-safe by construction (methods return boxed futures) so the engine
/// can hold an `Arc<dyn Store>` and be swapped onto a different backend
/// without generic plumbing through every handler.
pub trait Store: Send + Sync {
    /// Reads a single path's current value, or `None` if absent.
    fn read<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Option<Value>, StoreError>>;

    /// Applies every (path, value) pair atomically, or none of them.
    /// `None` as a value deletes that path.
    fn commit<'a>(&'a self, updates: Update) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Retries `f(current) -> outcome` against `root` until the write is
    /// accepted without a concurrent change to `root` racing it, or the
    /// retry budget is exhausted.
    fn transact<'a, F>(&'a self, root: &'a Path, f: F) -> BoxFuture<'a, Result<(), StoreError>>
    where
        F: FnMut(Option<Value>) -> TransactionOutcome + Send + 'a;

    /// Lists the distinct immediate child segment names stored under
    /// `prefix` (e.g. world ids under `worlds`, chunk keys under
    /// `worlds/{w}/chunks`). Used by the tick engine to discover what to
    /// scan without requiring every caller to track an index separately.
    fn list_children<'a>(&'a self, prefix: &'a Path) -> BoxFuture<'a, Result<Vec<String>, StoreError>>;
}
