//! Shared doubles for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::observability::{BufferEvent, MetricsError, MetricsSink};
use crate::storage::{BufferStore, InMemoryStore, StorageError};

/// Store whose every call fails as if Redis were down.
pub(crate) struct FailingStore;

fn down() -> StorageError {
    StorageError::Unavailable("connection refused".into())
}

#[async_trait]
impl BufferStore for FailingStore {
    async fn push(&self, _list: &str, _payload: &str) -> Result<(), StorageError> {
        Err(down())
    }

    async fn move_to_inflight(
        &self,
        _inbox: &str,
        _inflight: &str,
        _count: usize,
    ) -> Result<Vec<String>, StorageError> {
        Err(down())
    }

    async fn delete(&self, _key: &str) -> Result<bool, StorageError> {
        Err(down())
    }

    async fn requeue_idle_inflights(
        &self,
        _inflight_prefix: &str,
        _inbox: &str,
        _idle_after: Duration,
    ) -> Result<u64, StorageError> {
        Err(down())
    }

    async fn len(&self, _list: &str) -> Result<u64, StorageError> {
        Err(down())
    }
}

/// Keeps every event it sees, in order.
#[derive(Default)]
pub(crate) struct RecordingMetrics {
    events: Mutex<Vec<BufferEvent>>,
}

impl RecordingMetrics {
    pub(crate) fn events(&self) -> Vec<BufferEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, event: &BufferEvent) -> Result<(), MetricsError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        Ok(())
    }
}

/// Sink that rejects everything.
pub(crate) struct FailingMetrics;

impl MetricsSink for FailingMetrics {
    fn record(&self, _event: &BufferEvent) -> Result<(), MetricsError> {
        Err(MetricsError::Unavailable("telemetry endpoint timed out".into()))
    }
}

/// Sink that panics instead of returning an error.
pub(crate) struct PanickingMetrics;

impl MetricsSink for PanickingMetrics {
    fn record(&self, event: &BufferEvent) -> Result<(), MetricsError> {
        panic!("metrics exporter crashed on {}", event.name());
    }
}

/// Wraps an [`InMemoryStore`] and counts expiry calls.
#[derive(Default)]
pub(crate) struct CountingStore {
    inner: InMemoryStore,
    expiry_calls: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn expiry_calls(&self) -> usize {
        self.expiry_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BufferStore for CountingStore {
    async fn push(&self, list: &str, payload: &str) -> Result<(), StorageError> {
        self.inner.push(list, payload).await
    }

    async fn move_to_inflight(
        &self,
        inbox: &str,
        inflight: &str,
        count: usize,
    ) -> Result<Vec<String>, StorageError> {
        self.inner.move_to_inflight(inbox, inflight, count).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.delete(key).await
    }

    async fn requeue_idle_inflights(
        &self,
        inflight_prefix: &str,
        inbox: &str,
        idle_after: Duration,
    ) -> Result<u64, StorageError> {
        self.expiry_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .requeue_idle_inflights(inflight_prefix, inbox, idle_after)
            .await
    }

    async fn len(&self, list: &str) -> Result<u64, StorageError> {
        self.inner.len(list).await
    }
}
