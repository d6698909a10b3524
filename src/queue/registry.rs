//! The set of buffer queues a process works with.
//!
//! Built once at startup and shared (usually behind an `Arc`) with whatever
//! publishes, polls or sweeps, instead of keeping queues in globals.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::naming::PriorityClass;
use super::queue::{BufferQueue, Queue};
use crate::config::BufferConfig;
use crate::observability::MetricsSink;
use crate::storage::{BufferStore, StorageError};

/// Delivery channel; used as the queue suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Email, Channel::Sms];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbox depth of one registered queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub channel: Channel,
    pub priority_class: Option<PriorityClass>,
    pub inbox: String,
    pub pending: u64,
}

type QueueKey = (Channel, Option<PriorityClass>);

/// Queues keyed by channel and priority class.
#[derive(Clone, Default)]
pub struct QueueRegistry {
    queues: BTreeMap<QueueKey, Arc<BufferQueue>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every channel, once without a priority class and once per class.
    ///
    /// All queues share `store`, `metrics` and the expiry window from `config`.
    pub fn standard(
        store: Arc<dyn BufferStore>,
        metrics: Arc<dyn MetricsSink>,
        config: &BufferConfig,
    ) -> Result<Self, StorageError> {
        let mut registry = Self::new();
        for channel in Channel::ALL {
            let lanes = std::iter::once(None).chain(PriorityClass::ALL.into_iter().map(Some));
            for priority_class in lanes {
                let queue = BufferQueue::new(
                    store.clone(),
                    config.queue(Some(channel.as_str()), priority_class),
                )?
                .with_metrics(metrics.clone());
                registry.register(channel, priority_class, queue);
            }
        }
        Ok(registry)
    }

    /// Add or replace the queue for `(channel, priority_class)`.
    pub fn register(
        &mut self,
        channel: Channel,
        priority_class: Option<PriorityClass>,
        queue: BufferQueue,
    ) -> Option<Arc<BufferQueue>> {
        self.queues
            .insert((channel, priority_class), Arc::new(queue))
    }

    pub fn get(
        &self,
        channel: Channel,
        priority_class: Option<PriorityClass>,
    ) -> Option<&Arc<BufferQueue>> {
        self.queues.get(&(channel, priority_class))
    }

    /// All queues in channel, then priority class order.
    pub fn queues(&self) -> impl Iterator<Item = &Arc<BufferQueue>> {
        self.queues.values()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Run `expire_inflights` on every queue concurrently.
    ///
    /// A failing queue is logged and skipped; the others still run. Returns
    /// the total number of inflight lists reclaimed.
    pub async fn expire_all_inflights(&self) -> u64 {
        let sweeps = self.queues.values().map(|queue| async move {
            (queue.inbox_name(), queue.expire_inflights().await)
        });

        let mut reclaimed = 0u64;
        for (inbox, result) in join_all(sweeps).await {
            match result {
                Ok(n) => reclaimed += n,
                Err(e) => error!(inbox = %inbox, error = %e, "Failed to expire inflight lists"),
            }
        }

        if reclaimed > 0 {
            info!(reclaimed, queues = self.queues.len(), "Inflight sweep requeued abandoned work");
        }
        reclaimed
    }

    /// Pending inbox items per queue.
    pub async fn stats(&self) -> Result<Vec<QueueStats>, StorageError> {
        let mut stats = Vec::with_capacity(self.queues.len());
        for ((channel, priority_class), queue) in &self.queues {
            stats.push(QueueStats {
                channel: *channel,
                priority_class: *priority_class,
                inbox: queue.inbox_name().to_string(),
                pending: queue.inbox_len().await?,
            });
        }
        Ok(stats)
    }
}
