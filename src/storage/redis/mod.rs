//! Redis store implementation for the buffer.
//!
//! This module provides the default [`BufferStore`], keeping inboxes and
//! inflight lists as plain Redis lists.
//!
//! # Features
//!
//! - Atomic inbox-to-inflight moves via Lua, chunked into bounded batches
//! - Idle-time based recovery using `OBJECT IDLETIME`
//! - Pooled connections (bb8) verified with `PING` at build time
//!
//! # Usage
//!
//! ```rust,ignore
//! use notify_buffer::storage::RedisStore;
//!
//! let store = RedisStore::builder()
//!     .redis_url("redis://localhost:6379")
//!     .build()
//!     .await?;
//! ```
//!
//! # Server Requirements
//!
//! `OBJECT IDLETIME` is unavailable when `maxmemory-policy` is one of the LFU
//! policies; expiry sweeps fail with [`StorageError::Internal`] on such
//! servers. Valkey works the same as Redis here.

mod lists;
mod pool;

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::{bb8::Pool, RedisConnectionManager};

pub use pool::RedisConfig;
pub use pool::create_redis_pool_with_config;

use super::error::StorageError;
use super::traits::BufferStore;

/// Redis-backed [`BufferStore`].
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool<RedisConnectionManager>,
}

impl RedisStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: Pool<RedisConnectionManager>) -> Self {
        Self { pool }
    }

    /// Create a builder for configuring the Redis store.
    pub fn builder() -> RedisStoreBuilder {
        RedisStoreBuilder::new()
    }

    /// Get the Redis connection pool.
    pub fn pool(&self) -> &Pool<RedisConnectionManager> {
        &self.pool
    }
}

/// Builder for creating a Redis store with custom configuration.
pub struct RedisStoreBuilder {
    redis_url: Option<String>,
    config: Option<RedisConfig>,
}

impl RedisStoreBuilder {
    pub fn new() -> Self {
        Self {
            redis_url: None,
            config: None,
        }
    }

    /// Set the Redis URL.
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    /// Set the Redis pool configuration.
    pub fn config(mut self, config: RedisConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pool and verify connectivity.
    pub async fn build(self) -> Result<RedisStore, StorageError> {
        let redis_url = self
            .redis_url
            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());
        let config = self.config.unwrap_or_default();

        let pool = create_redis_pool_with_config(&redis_url, config).await?;
        Ok(RedisStore::new(pool))
    }
}

impl Default for RedisStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BufferStore for RedisStore {
    async fn push(&self, list: &str, payload: &str) -> Result<(), StorageError> {
        lists::push(self, list, payload).await
    }

    async fn move_to_inflight(
        &self,
        inbox: &str,
        inflight: &str,
        count: usize,
    ) -> Result<Vec<String>, StorageError> {
        lists::move_to_inflight(self, inbox, inflight, count).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        lists::delete(self, key).await
    }

    async fn requeue_idle_inflights(
        &self,
        inflight_prefix: &str,
        inbox: &str,
        idle_after: Duration,
    ) -> Result<u64, StorageError> {
        lists::requeue_idle_inflights(self, inflight_prefix, inbox, idle_after).await
    }

    async fn len(&self, list: &str) -> Result<u64, StorageError> {
        lists::len(self, list).await
    }
}

/// These tests talk to a real server: `REDIS_URL=redis://127.0.0.1:6379
/// cargo test -- --ignored`. Each test works under its own random suffix.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{BufferQueue, PriorityClass, Queue, QueueConfig};
    use std::sync::Arc;

    async fn store() -> RedisStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        RedisStore::builder()
            .redis_url(url)
            .config(RedisConfig {
                max_size: 4,
                min_idle: 1,
                ..RedisConfig::default()
            })
            .build()
            .await
            .unwrap()
    }

    fn unique_suffix() -> String {
        format!("test{}", uuid::Uuid::new_v4().simple())
    }

    fn queue(store: &RedisStore, priority: Option<PriorityClass>, expire_secs: u64) -> BufferQueue {
        queue_for(store, unique_suffix(), priority, expire_secs)
    }

    fn queue_for(
        store: &RedisStore,
        suffix: String,
        priority: Option<PriorityClass>,
        expire_secs: u64,
    ) -> BufferQueue {
        BufferQueue::new(
            Arc::new(store.clone()),
            QueueConfig {
                suffix: Some(suffix),
                priority_class: priority,
                expire_inflight_after_seconds: expire_secs,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn publish_poll_acknowledge_roundtrip() {
        let store = store().await;
        let queue = queue(&store, None, 300);

        for payload in ["m1", "m2", "m3"] {
            queue.publish(payload).await.unwrap();
        }

        let (receipt, items) = queue.poll(10).await.unwrap();
        assert_eq!(items, vec!["m1", "m2", "m3"]);
        assert_eq!(queue.inbox_len().await.unwrap(), 0);
        assert_eq!(queue.inflight_len(receipt).await.unwrap(), 3);

        assert!(queue.acknowledge(receipt).await.unwrap());
        assert!(!queue.acknowledge(receipt).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn large_poll_crosses_chunks_in_order() {
        let store = store().await;
        let queue = queue(&store, Some(PriorityClass::Bulk), 300);

        let payloads: Vec<String> = (0..500).map(|i| format!("item-{i}")).collect();
        for payload in &payloads {
            queue.publish(payload).await.unwrap();
        }

        let (receipt, items) = queue.poll(500).await.unwrap();
        assert_eq!(items, payloads);
        assert_eq!(queue.inbox_len().await.unwrap(), 0);
        assert!(queue.acknowledge(receipt).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn expiry_requeues_after_idle_window() {
        let store = store().await;
        let queue = queue(&store, Some(PriorityClass::Normal), 1);

        queue.publish("a").await.unwrap();
        queue.publish("b").await.unwrap();
        let (receipt, items) = queue.poll(10).await.unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(queue.expire_inflights().await.unwrap(), 0);

        // OBJECT IDLETIME has one second resolution and must exceed the window.
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(queue.expire_inflights().await.unwrap(), 1);

        assert!(!queue.acknowledge(receipt).await.unwrap());
        let (retry, requeued) = queue.poll(10).await.unwrap();
        assert_eq!(requeued, vec!["a", "b"]);
        assert!(queue.acknowledge(retry).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn unknown_receipt_and_non_positive_counts() {
        let store = store().await;
        let queue = queue(&store, None, 300);
        queue.publish("kept").await.unwrap();

        assert!(!queue.acknowledge(uuid::Uuid::new_v4()).await.unwrap());

        for count in [0, -1] {
            let (receipt, items) = queue.poll(count).await.unwrap();
            assert!(items.is_empty());
            assert_eq!(queue.inflight_len(receipt).await.unwrap(), 0);
        }
        assert_eq!(queue.inbox_len().await.unwrap(), 1);

        let (receipt, items) = queue.poll(10).await.unwrap();
        assert_eq!(items, vec!["kept"]);
        assert!(queue.acknowledge(receipt).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires a running Redis server"]
    async fn concurrent_polls_partition_the_inbox() {
        let store = store().await;
        let queue = Arc::new(queue(&store, None, 300));
        let payloads: Vec<String> = (0..600).map(|i| format!("n-{i}")).collect();
        for payload in &payloads {
            queue.publish(payload).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                loop {
                    let (receipt, items) = queue.poll(13).await.unwrap();
                    if items.is_empty() {
                        break;
                    }
                    assert!(queue.acknowledge(receipt).await.unwrap());
                    seen.extend(items);
                }
                seen
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort();

        let mut expected = payloads;
        expected.sort();
        assert_eq!(all, expected);
        assert_eq!(queue.inbox_len().await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn expiry_does_not_cross_into_priority_lanes() {
        let store = store().await;
        let suffix = unique_suffix();
        let plain = queue_for(&store, suffix.clone(), None, 1);
        let bulk = queue_for(&store, suffix, Some(PriorityClass::Bulk), 1);

        plain.publish("plain-item").await.unwrap();
        bulk.publish("bulk-item").await.unwrap();
        let (plain_receipt, _) = plain.poll(10).await.unwrap();
        let (bulk_receipt, _) = bulk.poll(10).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(plain.expire_inflights().await.unwrap(), 1);
        assert_eq!(plain.inbox_len().await.unwrap(), 1);
        assert_eq!(bulk.inbox_len().await.unwrap(), 0);
        assert!(!plain.acknowledge(plain_receipt).await.unwrap());

        assert_eq!(bulk.expire_inflights().await.unwrap(), 1);
        assert!(!bulk.acknowledge(bulk_receipt).await.unwrap());

        let (retry, items) = plain.poll(10).await.unwrap();
        assert_eq!(items, vec!["plain-item"]);
        assert!(plain.acknowledge(retry).await.unwrap());
        let (retry, items) = bulk.poll(10).await.unwrap();
        assert_eq!(items, vec!["bulk-item"]);
        assert!(bulk.acknowledge(retry).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn expiry_leaves_fresh_inflights_alone() {
        let store = store().await;
        let queue = queue(&store, Some(PriorityClass::Priority), 300);

        queue.publish("fresh").await.unwrap();
        let (receipt, _) = queue.poll(10).await.unwrap();

        assert_eq!(queue.expire_inflights().await.unwrap(), 0);
        assert_eq!(queue.inbox_len().await.unwrap(), 0);
        assert!(queue.acknowledge(receipt).await.unwrap());
    }
}
