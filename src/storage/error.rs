//! Store-agnostic error type for buffer stores.
//!
//! Every [`BufferStore`](super::BufferStore) implementation maps its internal
//! failures to [`StorageError`]. The queue core never wraps these: a failed
//! `publish`, `poll`, `acknowledge` or `expire_inflights` hands the caller the
//! store's error as-is, and retrying is the caller's decision.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// # Examples
///
/// ```rust
/// use notify_buffer::storage::StorageError;
///
/// fn handle_error(err: StorageError) {
///     match err {
///         StorageError::Unavailable(msg) => {
///             // Connection lost, retry later
///             eprintln!("Store unavailable: {}", msg);
///         }
///         StorageError::Configuration(msg) => {
///             eprintln!("Bad configuration: {}", msg);
///         }
///         _ => {
///             eprintln!("Error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Error, Debug)]
pub enum StorageError {
    /// Store is unavailable (connection lost, service down, etc.)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Timeout while talking to the store
    #[error("operation timeout: {0}")]
    Timeout(String),

    /// The store answered with something we could not make sense of
    #[error("internal error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    /// Returns true if this error is potentially recoverable with a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Timeout(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            StorageError::Timeout(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            StorageError::Unavailable(err.to_string())
        } else {
            StorageError::Internal(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_variants() {
        assert!(StorageError::Unavailable("down".into()).is_retryable());
        assert!(StorageError::Timeout("slow".into()).is_retryable());
        assert!(!StorageError::Internal("bad reply".into()).is_retryable());
        assert!(!StorageError::Configuration("bad url".into()).is_retryable());
    }

    #[test]
    fn display_carries_context() {
        let err = StorageError::Unavailable("connection refused".into());
        assert_eq!(err.to_string(), "store unavailable: connection refused");
    }
}
