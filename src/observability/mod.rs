//! Observability hooks for the buffer.
//!
//! This module provides:
//! - [`MetricsSink`]: observer notified on publish, poll, acknowledge and expiry
//! - [`BufferEvent`]: the events a sink receives
//! - [`NoopMetrics`], [`TracingMetrics`]: built-in sinks

mod metrics;

pub use metrics::{BufferEvent, MetricsError, MetricsSink, NoopMetrics, TracingMetrics};
