//! Example: publish, poll, acknowledge and sweep against Redis
//!
//! Publishes a handful of SMS notifications, saves one batch, abandons a
//! second batch and lets the background sweeper hand it back to the inbox.
//!
//! ## Prerequisites
//!
//! ```bash
//! docker run -d --name notify-buffer-redis -p 6379:6379 redis:7
//! ```
//!
//! ## Running
//!
//! ```bash
//! export REDIS_URL="redis://127.0.0.1:6379"
//! export BUFFER_EXPIRE_INFLIGHT_AFTER_SECONDS=3
//! export BUFFER_SWEEP_INTERVAL_SECONDS=1
//! cargo run --example buffer_roundtrip
//! ```

use std::sync::Arc;

use notify_buffer::queue::{Channel, Queue};
use notify_buffer::{BufferConfig, InflightSweeper, QueueRegistry, RedisStore, TracingMetrics};
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notify_buffer=debug,buffer_roundtrip=info".into()),
        )
        .init();

    let config = BufferConfig::from_env()?;
    let store = RedisStore::builder()
        .redis_url(&config.redis_url)
        .config(config.pool)
        .build()
        .await?;

    let registry = Arc::new(QueueRegistry::standard(
        Arc::new(store),
        Arc::new(TracingMetrics),
        &config,
    )?);
    let sweeper = InflightSweeper::spawn(registry.clone(), config.sweep_interval());

    let sms = registry
        .get(Channel::Sms, None)
        .ok_or_else(|| anyhow::anyhow!("sms queue missing from registry"))?;

    for n in 0..6 {
        let notification = json!({ "to": format!("+1555010{}", n), "body": "Your code is 1234" });
        sms.publish(&notification.to_string()).await?;
    }
    info!(pending = sms.inbox_len().await?, "Published notifications");

    let (receipt, batch) = sms.poll(3).await?;
    info!(%receipt, size = batch.len(), "Saving batch");
    sms.acknowledge(receipt).await?;

    let (abandoned, batch) = sms.poll(3).await?;
    info!(%abandoned, size = batch.len(), "Abandoning batch without acknowledging");

    let wait = sms.expire_inflight_after() + config.sweep_interval() * 2;
    info!(wait_secs = wait.as_secs(), "Waiting for the sweeper");
    tokio::select! {
        _ = tokio::time::sleep(wait) => {},
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C signal"),
    }

    let (receipt, batch) = sms.poll(10).await?;
    info!(%receipt, size = batch.len(), "Recovered abandoned batch");
    sms.acknowledge(receipt).await?;

    let reclaimed = sweeper.shutdown().await;
    for stats in registry.stats().await? {
        info!(inbox = %stats.inbox, pending = stats.pending, "Queue depth");
    }
    info!(reclaimed, "Done");
    Ok(())
}
