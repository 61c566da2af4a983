//! The hierarchical key-value store contract the simulation engine is built
//! against, plus a reference in-memory implementation.
//!
//! The production backend (a real multi-path-atomic, optimistic-transaction
//! KV store) is an external collaborator — out of scope for this crate. What
//! lives here is the trait every command handler and the tick engine consume,
//! and an in-memory implementation satisfying it, sufficient for tests and a
//! single-process deployment.

pub mod error;
pub mod memory;
pub mod path;
pub mod store;

pub use error::StoreError;
pub use path::Path;
pub use store::{Store, TransactionOutcome, Update, Value};
pub use memory::InMemoryStore;
