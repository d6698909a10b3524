//! # notify-buffer
//!
//! An at-least-once buffer for notifications waiting to be batch-saved.
//!
//! Producers append serialized notifications to an inbox list. A consumer
//! polls a batch, which atomically moves it to a fresh inflight list named by
//! a receipt UUID, persists the batch, then acknowledges the receipt. Inflight
//! lists left untouched for longer than the expiry window are pushed back to
//! the inbox by a periodic sweep, so a crashed consumer loses nothing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use notify_buffer::{BufferConfig, InflightSweeper, NoopMetrics, QueueRegistry, RedisStore};
//! use notify_buffer::queue::{Channel, Queue};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BufferConfig::from_env()?;
//! let store = RedisStore::builder()
//!     .redis_url(&config.redis_url)
//!     .config(config.pool)
//!     .build()
//!     .await?;
//!
//! let registry = Arc::new(QueueRegistry::standard(Arc::new(store), Arc::new(NoopMetrics), &config)?);
//! let sweeper = InflightSweeper::spawn(registry.clone(), config.sweep_interval());
//!
//! let sms = registry.get(Channel::Sms, None).expect("standard registry has sms");
//! sms.publish(r#"{"to":"+15550100"}"#).await?;
//! let (receipt, batch) = sms.poll(100).await?;
//! // persist `batch`...
//! sms.acknowledge(receipt).await?;
//!
//! sweeper.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `redis` (default): the Redis store, built on `redis` and `bb8-redis`

pub mod config;
pub mod observability;
pub mod queue;
pub mod runner;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::{BufferConfig, QueueConfig};
pub use observability::{BufferEvent, MetricsError, MetricsSink, NoopMetrics, TracingMetrics};
pub use queue::{BufferQueue, PriorityClass, Queue, QueueRegistry};
pub use runner::{InflightSweeper, SweeperHandle};
pub use storage::{BufferStore, InMemoryStore, StorageError};

#[cfg(feature = "redis")]
pub use storage::{RedisConfig, RedisStore};
