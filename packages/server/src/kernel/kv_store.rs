//! Process-local key-value store with per-entry TTL.
//!
//! Single-instance only: two server processes each get their own map, so
//! concurrent requests for the same key from different processes would race.
//! Multi-instance deployments need a shared store behind `BaseKeyValueStore`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{BaseKeyValueStore, Clock};

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

/// In-memory TTL store. Cloning shares the underlying map.
#[derive(Clone)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryKeyValueStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Start a background task that purges expired entries every `interval`.
    ///
    /// The returned handle must be shut down on teardown.
    pub fn spawn_sweeper(&self, interval: std::time::Duration) -> SweeperHandle {
        let store = self.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let removed = store.purge_expired().await;
                        if removed > 0 {
                            debug!(removed, "Purged expired key-value entries");
                        }
                    }
                }
            }
        });

        SweeperHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

#[async_trait]
impl BaseKeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let expires_at = self.clock.now() + ttl;
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

/// Owns the sweeper task started by [`InMemoryKeyValueStore::spawn_sweeper`].
pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if self.stop.is_some() {
            self.task.abort();
        }
    }
}
