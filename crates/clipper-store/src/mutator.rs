//! Serialized read-modify-write access to whole-collection keys.
//!
//! The backend only offers "replace the whole value" writes, so two
//! interleaved read-modify-write sequences on one key would silently drop
//! one side's update. Every mutation of a key therefore runs inside that
//! key's async mutex. As a second guard the value is re-read right before the
//! write; if it no longer matches the snapshot the mutation started from, the
//! whole read-modify-write is retried, up to `max_attempts` times.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, trace, warn};

use clipper_core::{defaults, Error, Result, StorageBackend};

type KeyLocks = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Per-key serialized access to a [`StorageBackend`].
///
/// Cloning is cheap and clones share the same lock table, so every clone
/// serializes against every other.
#[derive(Clone)]
pub struct StoreMutator {
    backend: Arc<dyn StorageBackend>,
    locks: KeyLocks,
    max_attempts: u32,
}

impl StoreMutator {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_max_attempts(backend, defaults::STORE_WRITE_ATTEMPTS)
    }

    pub fn with_max_attempts(backend: Arc<dyn StorageBackend>, max_attempts: u32) -> Self {
        Self {
            backend,
            locks: Arc::new(Mutex::new(HashMap::new())),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn key_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn read_raw(&self, key: &str) -> Result<Option<JsonValue>> {
        let mut values = self.backend.get(&[key]).await?;
        Ok(values.remove(key).filter(|v| !v.is_null()))
    }

    async fn write_raw(&self, key: &str, value: JsonValue) -> Result<()> {
        let mut items = HashMap::with_capacity(1);
        items.insert(key.to_string(), value);
        self.backend.set(items).await
    }

    /// Read a whole collection. A missing or null key reads as empty.
    pub async fn read_all<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let raw = self.read_raw(key).await?;
        decode_collection(key, raw)
    }

    /// Replace a whole collection.
    pub async fn write_all<T: Serialize + Sync>(&self, key: &str, items: &[T]) -> Result<()> {
        let value = serde_json::to_value(items)?;
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        self.write_raw(key, value).await
    }

    /// Read a scalar key. Missing and null both read as `None`.
    pub async fn read_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_raw(key).await? {
            None => Ok(None),
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| Error::Serialization(format!("key '{}': {}", key, e))),
        }
    }

    /// Write a scalar key.
    pub async fn write_value<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;
        self.write_raw(key, value).await
    }

    /// Write several scalar keys in one backend call.
    ///
    /// Locks are taken in key order so concurrent multi-key writers cannot
    /// deadlock.
    pub async fn write_values(&self, items: Vec<(String, JsonValue)>) -> Result<()> {
        let mut keys: Vec<String> = items.iter().map(|(k, _)| k.clone()).collect();
        keys.sort();
        keys.dedup();
        let locks: Vec<_> = keys.iter().map(|k| self.key_lock(k)).collect();
        let mut guards = Vec::with_capacity(locks.len());
        for lock in &locks {
            guards.push(lock.lock().await);
        }
        self.backend.set(items.into_iter().collect()).await
    }

    /// Read-modify-write one collection.
    ///
    /// `f` may run more than once when a conflicting write is detected, so it
    /// must only depend on the items it is given. Its return value from the
    /// attempt that was committed is returned. Fails with
    /// [`Error::StoreWriteExhausted`] once the attempt bound is reached.
    pub async fn mutate<T, R, F>(&self, key: &str, mut f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Send,
        R: Send,
        F: FnMut(&mut Vec<T>) -> R + Send,
    {
        let started = Instant::now();
        let lock = self.key_lock(key);
        let _guard = lock.lock().await;

        for attempt in 1..=self.max_attempts {
            let snapshot = self.read_raw(key).await?;
            let mut items: Vec<T> = decode_collection(key, snapshot.clone())?;
            let out = f(&mut items);
            let encoded = serde_json::to_value(&items)?;

            let current = self.read_raw(key).await?;
            if current != snapshot {
                warn!(
                    subsystem = "store",
                    component = "mutator",
                    key,
                    attempt,
                    "Collection changed during read-modify-write, retrying"
                );
                continue;
            }

            if snapshot.as_ref() == Some(&encoded) {
                trace!(key, "Mutation left collection unchanged, skipping write");
                return Ok(out);
            }

            self.write_raw(key, encoded).await?;
            debug!(
                subsystem = "store",
                component = "mutator",
                op = "mutate",
                key,
                attempt,
                duration_ms = started.elapsed().as_millis() as u64,
                "Collection mutated"
            );
            return Ok(out);
        }

        error!(
            subsystem = "store",
            component = "mutator",
            key,
            attempts = self.max_attempts,
            "Read-modify-write retries exhausted"
        );
        Err(Error::StoreWriteExhausted {
            key: key.to_string(),
            attempts: self.max_attempts,
        })
    }
}

fn decode_collection<T: DeserializeOwned>(key: &str, raw: Option<JsonValue>) -> Result<Vec<T>> {
    match raw {
        None => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| Error::Serialization(format!("key '{}': {}", key, e))),
    }
}
