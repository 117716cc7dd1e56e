//! JSON file storage backend.
//!
//! The whole key-value map lives in one JSON object on disk. Reads are served
//! from an in-memory copy loaded at open; every `set` rewrites the file via a
//! temporary sibling and a rename so a crash never leaves a torn file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::fs;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use clipper_core::{ChangeBus, Error, Result, StorageBackend, StoreChange};

/// File-backed key-value store.
pub struct JsonFileBackend {
    path: PathBuf,
    data: RwLock<HashMap<String, JsonValue>>,
    bus: ChangeBus,
}

impl JsonFileBackend {
    /// Open `path`, loading existing contents. A missing file starts empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => HashMap::new(),
            Ok(bytes) => serde_json::from_slice::<HashMap<String, JsonValue>>(&bytes).map_err(
                |e| Error::Storage(format!("Corrupt store file {}: {}", path.display(), e)),
            )?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Store file missing, starting empty");
                HashMap::new()
            }
            Err(e) => return Err(Error::Io(e)),
        };

        info!(path = %path.display(), keys = data.len(), "Opened JSON store");
        Ok(Self {
            path,
            data: RwLock::new(data),
            bus: ChangeBus::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, data: &HashMap<String, JsonValue>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, JsonValue>> {
        let data = self.data.read().await;
        Ok(keys
            .iter()
            .filter_map(|k| data.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, items: HashMap<String, JsonValue>) -> Result<()> {
        let change = StoreChange::new(items.keys().cloned());
        {
            // Held across the flush so file writes land in commit order.
            let mut data = self.data.write().await;
            let mut next = data.clone();
            next.extend(items);
            self.flush(&next).await?;
            *data = next;
        }
        self.bus.emit(change);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.bus.subscribe()
    }
}
