//! Store abstraction layer for the buffer.
//!
//! The buffer queue only ever talks to a [`BufferStore`]. Redis is the
//! production store; the in-memory store backs tests and local runs.
//!
//! # Architecture
//!
//! - [`BufferStore`]: the atomic list operations the queue is built from
//! - [`StorageError`]: store-agnostic error type, returned unchanged to callers
//! - [`InMemoryStore`]: single-process implementation
//! - [`RedisStore`]: Redis implementation (feature `redis`, on by default)
//!
//! # Using the Redis Store
//!
//! ```rust,ignore
//! use notify_buffer::queue::{BufferQueue, QueueConfig};
//! use notify_buffer::storage::RedisStore;
//! use std::sync::Arc;
//!
//! let store = RedisStore::builder()
//!     .redis_url("redis://localhost:6379")
//!     .build()
//!     .await?;
//!
//! let queue = BufferQueue::new(Arc::new(store), QueueConfig::for_suffix("sms"))?;
//! ```

mod error;
pub mod memory;
mod traits;

#[cfg(feature = "redis")]
pub mod redis;

pub use error::StorageError;
pub use memory::InMemoryStore;
pub use traits::{BufferStore, MOVE_CHUNK_SIZE};

#[cfg(feature = "redis")]
pub use redis::{RedisConfig, RedisStore};
