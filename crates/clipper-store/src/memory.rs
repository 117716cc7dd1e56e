//! In-memory storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, RwLock};
use tracing::trace;

use clipper_core::{ChangeBus, Result, StorageBackend, StoreChange};

/// Process-local key-value store.
///
/// Every operation yields to the scheduler before touching the map, so
/// concurrent tasks interleave around it the way they would around real I/O.
pub struct MemoryBackend {
    data: RwLock<HashMap<String, JsonValue>>,
    bus: ChangeBus,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::seeded(HashMap::new())
    }

    /// Start with existing contents. Seeding does not notify subscribers.
    pub fn seeded(data: HashMap<String, JsonValue>) -> Self {
        Self {
            data: RwLock::new(data),
            bus: ChangeBus::default(),
        }
    }

    /// Copy of the full contents.
    pub async fn snapshot(&self) -> HashMap<String, JsonValue> {
        self.data.read().await.clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, JsonValue>> {
        tokio::task::yield_now().await;
        let data = self.data.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| data.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, items: HashMap<String, JsonValue>) -> Result<()> {
        tokio::task::yield_now().await;
        let change = StoreChange::new(items.keys().cloned());
        {
            let mut data = self.data.write().await;
            data.extend(items);
        }
        trace!(keys = ?change.keys, "Memory backend write");
        self.bus.emit(change);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_returns_only_present_keys() {
        let backend = MemoryBackend::seeded(HashMap::from([("a".to_string(), json!(1))]));
        let got = backend.get(&["a", "b"]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["a"], json!(1));
    }

    #[tokio::test]
    async fn test_set_notifies_with_written_keys() {
        let backend = MemoryBackend::new();
        let mut rx = backend.subscribe();
        backend
            .set(HashMap::from([
                ("clips".to_string(), json!([])),
                ("projects".to_string(), json!([])),
            ]))
            .await
            .unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.keys, vec!["clips", "projects"]);
        assert_eq!(backend.snapshot().await.len(), 2);
    }
}
