use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::queue::QueueRegistry;

/// Shortest pause between two sweeps; shorter intervals are raised to this.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that periodically requeues abandoned inflight lists.
///
/// Each pass calls [`QueueRegistry::expire_all_inflights`]; a pass that fails
/// for one queue is logged and the loop keeps going.
pub struct InflightSweeper;

impl InflightSweeper {
    /// Start sweeping every `interval`. The first pass runs immediately.
    ///
    /// An interval below [`MIN_SWEEP_INTERVAL`] is raised to it. The task
    /// stops when [`SweeperHandle::shutdown`] is called or the handle is
    /// dropped.
    pub fn spawn(registry: Arc<QueueRegistry>, interval: Duration) -> SweeperHandle {
        let interval = if interval < MIN_SWEEP_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                min_secs = MIN_SWEEP_INTERVAL.as_secs(),
                "Sweep interval too short, using minimum"
            );
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            debug!(interval_secs = interval.as_secs(), queues = registry.len(), "Starting inflight sweeper");
            let mut reclaimed = 0u64;
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }

                reclaimed += registry.expire_all_inflights().await;

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {},
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!(reclaimed, "Inflight sweeper stopped");
            reclaimed
        });

        SweeperHandle { shutdown_tx, task }
    }
}

/// Owner of a running [`InflightSweeper`].
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SweeperHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the sweeper and wait for an in-progress pass to finish.
    ///
    /// Returns the number of inflight lists requeued over the sweeper's life.
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown_tx.send(true);
        match self.task.await {
            Ok(reclaimed) => {
                info!(reclaimed, "Inflight sweeper shut down");
                reclaimed
            }
            Err(e) => {
                error!(error = %e, "Inflight sweeper task failed");
                0
            }
        }
    }
}
