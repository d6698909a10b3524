//! In-memory buffer store for tests and local development.
//!
//! All lists live in one map behind a single async mutex. Every operation
//! holds the lock for its full duration, which gives the same atomicity the
//! Redis store gets from its Lua scripts. Idle time is measured with
//! [`tokio::time::Instant`], so tests can drive expiry with paused time.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::error::StorageError;
use super::traits::{is_inflight_of, BufferStore};

struct StoredList {
    items: VecDeque<String>,
    last_access: Instant,
}

impl StoredList {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
            last_access: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_access = Instant::now();
    }
}

/// Process-local [`BufferStore`].
///
/// Cloning shares the underlying lists, so several queues built from clones
/// of one store see the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    lists: Arc<Mutex<HashMap<String, StoredList>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a list's contents without touching its idle clock.
    pub async fn peek(&self, list: &str) -> Vec<String> {
        let lists = self.lists.lock().await;
        lists
            .get(list)
            .map(|stored| stored.items.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of every list currently held, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let lists = self.lists.lock().await;
        let mut keys: Vec<String> = lists.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BufferStore for InMemoryStore {
    async fn push(&self, list: &str, payload: &str) -> Result<(), StorageError> {
        let mut lists = self.lists.lock().await;
        let stored = lists.entry(list.to_string()).or_insert_with(StoredList::new);
        stored.items.push_back(payload.to_string());
        stored.touch();
        Ok(())
    }

    async fn move_to_inflight(
        &self,
        inbox: &str,
        inflight: &str,
        count: usize,
    ) -> Result<Vec<String>, StorageError> {
        let mut lists = self.lists.lock().await;

        let moved: Vec<String> = match lists.get_mut(inbox) {
            Some(source) => {
                let take = count.min(source.items.len());
                source.touch();
                source.items.drain(..take).collect()
            }
            None => Vec::new(),
        };

        if lists.get(inbox).is_some_and(|source| source.items.is_empty()) {
            lists.remove(inbox);
        }

        if !moved.is_empty() {
            let destination = lists
                .entry(inflight.to_string())
                .or_insert_with(StoredList::new);
            destination.items.extend(moved.iter().cloned());
            destination.touch();
        }

        Ok(moved)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut lists = self.lists.lock().await;
        Ok(lists.remove(key).is_some())
    }

    async fn requeue_idle_inflights(
        &self,
        inflight_prefix: &str,
        inbox: &str,
        idle_after: Duration,
    ) -> Result<u64, StorageError> {
        let mut lists = self.lists.lock().await;
        let now = Instant::now();

        // Sort so that lists reclaimed in one sweep land in a stable order.
        let mut expired: Vec<(Instant, String)> = lists
            .iter()
            .filter(|(key, _)| is_inflight_of(key, inflight_prefix))
            .filter(|(_, stored)| now.duration_since(stored.last_access) > idle_after)
            .map(|(key, stored)| (stored.last_access, key.clone()))
            .collect();
        expired.sort();

        let mut reclaimed = 0u64;
        for (_, key) in expired {
            let Some(stored) = lists.remove(&key) else {
                continue;
            };
            let destination = lists.entry(inbox.to_string()).or_insert_with(StoredList::new);
            destination.items.extend(stored.items);
            destination.touch();
            reclaimed += 1;
        }

        Ok(reclaimed)
    }

    async fn len(&self, list: &str) -> Result<u64, StorageError> {
        let mut lists = self.lists.lock().await;
        Ok(lists
            .get_mut(list)
            .map(|stored| {
                stored.touch();
                stored.items.len() as u64
            })
            .unwrap_or(0))
    }
}
