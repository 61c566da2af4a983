//! Thin aliases over `parking_lot` so call sites read `SyncRwLock`/`SyncMutex`
//! rather than naming the backing crate directly, matching the convention the
//! rest of the workspace was built against.

/// A synchronous read-write lock.
pub type SyncRwLock<T> = parking_lot::RwLock<T>;
/// A synchronous mutex.
pub type SyncMutex<T> = parking_lot::Mutex<T>;
