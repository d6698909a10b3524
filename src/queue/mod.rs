//! The buffer queue.
//!
//! - [`Queue`]: publish, poll, acknowledge and expire
//! - [`BufferQueue`]: the store-backed implementation
//! - [`QueueRegistry`]: one queue per channel and priority class
//! - naming helpers deriving inbox and inflight list names

mod naming;
#[allow(clippy::module_inception)]
mod queue;
mod registry;

pub use crate::config::QueueConfig;
pub use naming::{inbox_name, inflight_name, inflight_prefix, validate_suffix, Buffer, PriorityClass};
pub use queue::{BufferQueue, Queue, DEFAULT_POLL_COUNT};
pub use registry::{Channel, QueueRegistry, QueueStats};
