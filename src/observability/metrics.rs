use std::time::Duration;

use thiserror::Error;
use tracing::info;

/// Something that happened to a buffer, reported to a [`MetricsSink`].
///
/// Every event is tagged with the inbox name of the queue it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferEvent {
    /// Payloads appended to the inbox.
    Published { inbox: String, count: u64 },
    /// Inflight lists created by a poll.
    InflightCreated { inbox: String, count: u64 },
    /// Inflight lists deleted by an acknowledgement.
    InflightAcknowledged { inbox: String, count: u64 },
    /// Inflight lists returned to the inbox by an expiry sweep.
    InflightExpired {
        inbox: String,
        count: u64,
        expire_after: Duration,
    },
}

impl BufferEvent {
    /// Stable metric name for the event.
    pub fn name(&self) -> &'static str {
        match self {
            BufferEvent::Published { .. } => "batch_saving_published",
            BufferEvent::InflightCreated { .. } => "batch_saving_inflight_created",
            BufferEvent::InflightAcknowledged { .. } => "batch_saving_inflight_processed",
            BufferEvent::InflightExpired { .. } => "batch_saving_inflight_expired",
        }
    }

    pub fn inbox(&self) -> &str {
        match self {
            BufferEvent::Published { inbox, .. }
            | BufferEvent::InflightCreated { inbox, .. }
            | BufferEvent::InflightAcknowledged { inbox, .. }
            | BufferEvent::InflightExpired { inbox, .. } => inbox,
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            BufferEvent::Published { count, .. }
            | BufferEvent::InflightCreated { count, .. }
            | BufferEvent::InflightAcknowledged { count, .. }
            | BufferEvent::InflightExpired { count, .. } => *count,
        }
    }
}

/// Failure reported by a metrics sink. Never surfaces from queue operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("metrics backend unavailable: {0}")]
    Unavailable(String),

    #[error("metric rejected: {0}")]
    Rejected(String),
}

/// Metrics sink to expose buffer counters without coupling to a specific backend.
///
/// Sinks are called inline from queue operations, so `record` should be quick
/// and must not block on I/O; hand the event to a background exporter if the
/// backend is remote.
pub trait MetricsSink: Send + Sync + 'static {
    fn record(&self, event: &BufferEvent) -> Result<(), MetricsError>;
}

/// No-op metrics sink
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _event: &BufferEvent) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// Emits each event as a structured `tracing` event at INFO level.
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn record(&self, event: &BufferEvent) -> Result<(), MetricsError> {
        match event {
            BufferEvent::InflightExpired {
                inbox,
                count,
                expire_after,
            } => info!(
                metric = event.name(),
                inbox = %inbox,
                count = *count,
                expire_after_secs = expire_after.as_secs(),
                "buffer metric"
            ),
            _ => info!(
                metric = event.name(),
                inbox = %event.inbox(),
                count = event.count(),
                "buffer metric"
            ),
        }
        Ok(())
    }
}
