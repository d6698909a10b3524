use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::naming::{self, PriorityClass};
use crate::config::QueueConfig;
use crate::observability::{BufferEvent, MetricsSink, NoopMetrics};
use crate::storage::{BufferStore, StorageError};

/// Number of items a consumer asks for when it has no better figure.
pub const DEFAULT_POLL_COUNT: i64 = 10;

/// Trait defining the interface for buffer queue operations.
///
/// Producers `publish`; consumers `poll`, process, then `acknowledge` the
/// receipt. Anything polled and never acknowledged comes back through
/// `expire_inflights` once it has been idle longer than the queue's window.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Append a payload to the tail of the inbox.
    async fn publish(&self, payload: &str) -> Result<(), StorageError>;

    /// Move up to `count` items from the inbox head into a new inflight list.
    ///
    /// Always mints a fresh receipt. A `count` of zero or less, or an empty
    /// inbox, yields no items and no inflight list; such a receipt need not be
    /// acknowledged.
    async fn poll(&self, count: i64) -> Result<(Uuid, Vec<String>), StorageError>;

    /// Delete the inflight list for `receipt`. Returns `false` when there is
    /// nothing to delete (already acknowledged, expired, or never created).
    async fn acknowledge(&self, receipt: Uuid) -> Result<bool, StorageError>;

    /// Requeue every inflight list idle longer than the expiry window.
    /// Returns the number of lists reclaimed.
    async fn expire_inflights(&self) -> Result<u64, StorageError>;
}

/// At-least-once buffer queue over a [`BufferStore`].
///
/// A queue is bound to one identity (suffix and priority class) and derives
/// its inbox and inflight names from it once, at construction. Several
/// `BufferQueue` values with the same identity, in one process or many,
/// operate on the same lists; all coordination happens in the store.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use notify_buffer::queue::{BufferQueue, Queue, QueueConfig};
/// use notify_buffer::storage::InMemoryStore;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), notify_buffer::storage::StorageError> {
/// let queue = BufferQueue::new(Arc::new(InMemoryStore::new()), QueueConfig::for_suffix("sms"))?;
///
/// queue.publish("m1").await?;
/// let (receipt, items) = queue.poll(10).await?;
/// assert_eq!(items, vec!["m1"]);
/// assert!(queue.acknowledge(receipt).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BufferQueue {
    store: Arc<dyn BufferStore>,
    suffix: Option<String>,
    priority_class: Option<PriorityClass>,
    inbox: String,
    inflight_prefix: String,
    expire_inflight_after: Duration,
    metrics: Arc<dyn MetricsSink>,
}

impl BufferQueue {
    /// Creates a queue for the identity in `config`.
    ///
    /// Fails with [`StorageError::Configuration`] if the suffix contains a
    /// character reserved by the naming scheme.
    pub fn new(store: Arc<dyn BufferStore>, config: QueueConfig) -> Result<Self, StorageError> {
        let suffix = config.suffix.filter(|s| !s.is_empty());
        if let Some(suffix) = suffix.as_deref() {
            naming::validate_suffix(suffix)?;
        }

        let inbox = naming::inbox_name(suffix.as_deref(), config.priority_class);
        let inflight_prefix = naming::inflight_prefix(suffix.as_deref(), config.priority_class);

        Ok(Self {
            store,
            suffix,
            priority_class: config.priority_class,
            inbox,
            inflight_prefix,
            expire_inflight_after: Duration::from_secs(config.expire_inflight_after_seconds),
            metrics: Arc::new(NoopMetrics),
        })
    }

    /// Optionally plug in a metrics sink.
    pub fn with_metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn priority_class(&self) -> Option<PriorityClass> {
        self.priority_class
    }

    pub fn expire_inflight_after(&self) -> Duration {
        self.expire_inflight_after
    }

    /// Name of this queue's inbox list.
    pub fn inbox_name(&self) -> &str {
        &self.inbox
    }

    /// Name of the inflight list a poll with `receipt` created.
    pub fn inflight_name(&self, receipt: Uuid) -> String {
        naming::inflight_name(&receipt, self.suffix.as_deref(), self.priority_class)
    }

    /// Number of items waiting in the inbox.
    pub async fn inbox_len(&self) -> Result<u64, StorageError> {
        self.store.len(&self.inbox).await
    }

    /// Number of items held under `receipt`, 0 if acknowledged or expired.
    pub async fn inflight_len(&self, receipt: Uuid) -> Result<u64, StorageError> {
        self.store.len(&self.inflight_name(receipt)).await
    }

    /// Report an event to the metrics sink; failures are logged and dropped.
    ///
    /// Runs after the store write has happened, so a panicking sink is caught
    /// here too instead of unwinding through an operation that already moved
    /// data.
    fn emit(&self, event: BufferEvent) {
        let recorded = panic::catch_unwind(AssertUnwindSafe(|| self.metrics.record(&event)));
        match recorded {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                inbox = %self.inbox,
                metric = event.name(),
                error = %e,
                "Failed to record buffer metric"
            ),
            Err(_) => warn!(
                inbox = %self.inbox,
                metric = event.name(),
                "Metrics sink panicked while recording buffer metric"
            ),
        }
    }
}

#[async_trait]
impl Queue for BufferQueue {
    async fn publish(&self, payload: &str) -> Result<(), StorageError> {
        self.store.push(&self.inbox, payload).await?;
        debug!(inbox = %self.inbox, "Payload published");

        self.emit(BufferEvent::Published {
            inbox: self.inbox.clone(),
            count: 1,
        });
        Ok(())
    }

    async fn poll(&self, count: i64) -> Result<(Uuid, Vec<String>), StorageError> {
        let receipt = Uuid::new_v4();
        if count <= 0 {
            return Ok((receipt, Vec::new()));
        }

        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let inflight = self.inflight_name(receipt);
        let items = self
            .store
            .move_to_inflight(&self.inbox, &inflight, count)
            .await?;

        if !items.is_empty() {
            debug!(
                inbox = %self.inbox,
                receipt = %receipt,
                count = items.len(),
                "Inflight list created"
            );
            self.emit(BufferEvent::InflightCreated {
                inbox: self.inbox.clone(),
                count: 1,
            });
        }

        Ok((receipt, items))
    }

    async fn acknowledge(&self, receipt: Uuid) -> Result<bool, StorageError> {
        let inflight = self.inflight_name(receipt);
        if !self.store.delete(&inflight).await? {
            warn!(
                inbox = %self.inbox,
                receipt = %receipt,
                "Inflight list not found on acknowledge; already acknowledged or expired"
            );
            return Ok(false);
        }

        debug!(inbox = %self.inbox, receipt = %receipt, "Inflight list acknowledged");
        self.emit(BufferEvent::InflightAcknowledged {
            inbox: self.inbox.clone(),
            count: 1,
        });
        Ok(true)
    }

    async fn expire_inflights(&self) -> Result<u64, StorageError> {
        let expired = self
            .store
            .requeue_idle_inflights(&self.inflight_prefix, &self.inbox, self.expire_inflight_after)
            .await?;

        if expired > 0 {
            info!(
                inbox = %self.inbox,
                expired,
                expire_after_secs = self.expire_inflight_after.as_secs(),
                "Expired inflight lists requeued"
            );
            self.emit(BufferEvent::InflightExpired {
                inbox: self.inbox.clone(),
                count: expired,
                expire_after: self.expire_inflight_after,
            });
        }

        Ok(expired)
    }
}
