//! Buffer configuration.
//!
//! [`QueueConfig`] describes a single queue; [`BufferConfig`] describes the
//! whole deployment (store location, expiry window, sweep cadence) and can be
//! deserialized or read from the environment.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::queue::PriorityClass;
use crate::storage::StorageError;

/// Default time an inflight list may sit untouched before it is requeued.
pub const DEFAULT_EXPIRE_INFLIGHT_AFTER_SECONDS: u64 = 300;

/// Default time between two expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_EXPIRE_INFLIGHT_AFTER_SECONDS: &str = "BUFFER_EXPIRE_INFLIGHT_AFTER_SECONDS";
pub const ENV_SWEEP_INTERVAL_SECONDS: &str = "BUFFER_SWEEP_INTERVAL_SECONDS";

/// Identity and expiry window of one queue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Logical sub-queue name, usually the channel (`sms`, `email`).
    pub suffix: Option<String>,
    pub priority_class: Option<PriorityClass>,
    pub expire_inflight_after_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            suffix: None,
            priority_class: None,
            expire_inflight_after_seconds: DEFAULT_EXPIRE_INFLIGHT_AFTER_SECONDS,
        }
    }
}

impl QueueConfig {
    pub fn for_suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: Some(suffix.into()),
            ..Self::default()
        }
    }

    pub fn with_priority_class(mut self, priority_class: PriorityClass) -> Self {
        self.priority_class = Some(priority_class);
        self
    }

    pub fn with_expire_inflight_after_seconds(mut self, seconds: u64) -> Self {
        self.expire_inflight_after_seconds = seconds;
        self
    }

    pub fn expire_inflight_after(&self) -> Duration {
        Duration::from_secs(self.expire_inflight_after_seconds)
    }
}

/// Deployment-wide buffer settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub redis_url: String,
    #[cfg(feature = "redis")]
    pub pool: crate::storage::RedisConfig,
    pub expire_inflight_after_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            #[cfg(feature = "redis")]
            pool: crate::storage::RedisConfig::default(),
            expire_inflight_after_seconds: DEFAULT_EXPIRE_INFLIGHT_AFTER_SECONDS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
        }
    }
}

impl BufferConfig {
    /// Defaults overridden by `REDIS_URL`, `BUFFER_EXPIRE_INFLIGHT_AFTER_SECONDS`
    /// and `BUFFER_SWEEP_INTERVAL_SECONDS` when set.
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_REDIS_URL) {
            config.redis_url = url;
        }
        if let Some(raw) = lookup(ENV_EXPIRE_INFLIGHT_AFTER_SECONDS) {
            config.expire_inflight_after_seconds = parse_seconds(ENV_EXPIRE_INFLIGHT_AFTER_SECONDS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SWEEP_INTERVAL_SECONDS) {
            config.sweep_interval_seconds = parse_seconds(ENV_SWEEP_INTERVAL_SECONDS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants between settings.
    ///
    /// A sweep interval at or above the expiry window is allowed but logged:
    /// abandoned work then waits up to twice the window before it is requeued.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.sweep_interval_seconds == 0 {
            return Err(StorageError::Configuration(
                "sweep_interval_seconds must be > 0".into(),
            ));
        }
        if self.sweep_interval_seconds >= self.expire_inflight_after_seconds {
            warn!(
                sweep_interval_secs = self.sweep_interval_seconds,
                expire_after_secs = self.expire_inflight_after_seconds,
                "Sweep interval is not shorter than the inflight expiry window"
            );
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Queue settings for one identity under this deployment.
    pub fn queue(&self, suffix: Option<&str>, priority_class: Option<PriorityClass>) -> QueueConfig {
        QueueConfig {
            suffix: suffix.map(str::to_string),
            priority_class,
            expire_inflight_after_seconds: self.expire_inflight_after_seconds,
        }
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<u64, StorageError> {
    raw.trim().parse::<u64>().map_err(|e| {
        StorageError::Configuration(format!("{} must be a whole number of seconds, got '{}': {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = BufferConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.expire_inflight_after_seconds, 300);
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn environment_overrides() {
        let config = BufferConfig::from_lookup(lookup(&[
            (ENV_REDIS_URL, "redis://cache:6380/2"),
            (ENV_EXPIRE_INFLIGHT_AFTER_SECONDS, "120"),
            (ENV_SWEEP_INTERVAL_SECONDS, " 30 "),
        ]))
        .unwrap();
        assert_eq!(config.redis_url, "redis://cache:6380/2");
        assert_eq!(config.expire_inflight_after_seconds, 120);
        assert_eq!(config.sweep_interval_seconds, 30);
    }

    #[test]
    fn malformed_number_is_configuration_error() {
        let err = BufferConfig::from_lookup(lookup(&[(ENV_EXPIRE_INFLIGHT_AFTER_SECONDS, "5m")]))
            .unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
        assert!(err.to_string().contains(ENV_EXPIRE_INFLIGHT_AFTER_SECONDS));
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let err = BufferConfig::from_lookup(lookup(&[(ENV_SWEEP_INTERVAL_SECONDS, "0")])).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[test]
    fn queue_config_deserializes_with_defaults() {
        let config: QueueConfig =
            serde_json::from_str(r#"{"suffix": "sms", "priority_class": "bulk"}"#).unwrap();
        assert_eq!(
            config,
            QueueConfig::for_suffix("sms").with_priority_class(PriorityClass::Bulk)
        );
        assert_eq!(config.expire_inflight_after(), Duration::from_secs(300));
    }

    #[test]
    fn buffer_config_derives_queue_configs() {
        let config: BufferConfig =
            serde_json::from_str(r#"{"expire_inflight_after_seconds": 90}"#).unwrap();
        let queue = config.queue(Some("email"), Some(PriorityClass::Priority));
        assert_eq!(queue.suffix.as_deref(), Some("email"));
        assert_eq!(queue.priority_class, Some(PriorityClass::Priority));
        assert_eq!(queue.expire_inflight_after_seconds, 90);
    }
}
