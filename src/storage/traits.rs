//! Core trait for buffer stores.
//!
//! The buffer needs a key-value store with named lists, a way to scan keys by
//! prefix, per-key idle time and some form of atomic multi-key execution.
//! [`BufferStore`] exposes exactly the atomic units the queue core is built
//! from, so each implementation decides how to make them indivisible (a Lua
//! script on Redis, a single lock for the in-memory store).
//!
//! # Example: Implementing a Custom Store
//!
//! ```rust,ignore
//! use notify_buffer::storage::{BufferStore, StorageError};
//! use async_trait::async_trait;
//!
//! pub struct MyStore { /* ... */ }
//!
//! #[async_trait]
//! impl BufferStore for MyStore {
//!     // Implement the list operations...
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;

use super::error::StorageError;

/// Upper bound on the number of items moved by a single list command.
///
/// Stores move large batches in chunks of this size so that no single
/// command carries an unbounded payload.
pub const MOVE_CHUNK_SIZE: usize = 100;

/// List operations the buffer queue relies on.
///
/// # Implementation Notes
///
/// - `move_to_inflight` and the per-list migration inside
///   `requeue_idle_inflights` must be atomic: no observer may see an item in
///   both lists, in neither, or see a half-moved batch.
/// - Lists that become empty cease to exist; `len` of a missing list is 0.
/// - Errors should be mapped to [`StorageError`] variants and never retried
///   internally.
#[async_trait]
pub trait BufferStore: Send + Sync {
    /// Append `payload` to the tail of `list`.
    async fn push(&self, list: &str, payload: &str) -> Result<(), StorageError>;

    /// Atomically move up to `count` items from the head of `inbox` to the
    /// tail of `inflight`, preserving their order.
    ///
    /// Returns the moved items. When the inbox is empty nothing is written
    /// and `inflight` is not created.
    async fn move_to_inflight(
        &self,
        inbox: &str,
        inflight: &str,
        count: usize,
    ) -> Result<Vec<String>, StorageError>;

    /// Delete `key`. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Return every inflight list named `{inflight_prefix}:{uuid}` that has
    /// been idle longer than `idle_after` to the tail of `inbox`.
    ///
    /// Each list is appended in order and deleted as one atomic unit; distinct
    /// lists are migrated independently. Keys that merely share the prefix
    /// but do not end in a single UUID segment are left alone. Returns the
    /// number of lists reclaimed.
    async fn requeue_idle_inflights(
        &self,
        inflight_prefix: &str,
        inbox: &str,
        idle_after: Duration,
    ) -> Result<u64, StorageError>;

    /// Length of `list`, 0 if it does not exist.
    async fn len(&self, list: &str) -> Result<u64, StorageError>;
}

/// Returns true if `key` is `{prefix}:{uuid}` with nothing after the UUID.
///
/// Used by stores to filter scan results, since a scan pattern for
/// `in-flight:sms` also matches `in-flight:sms:bulk:<receipt>`.
pub(crate) fn is_inflight_of(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
        .map(|receipt| !receipt.contains(':') && uuid::Uuid::parse_str(receipt).is_ok())
        .unwrap_or(false)
}
