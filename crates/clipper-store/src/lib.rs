//! # clipper-store
//!
//! Race-safe persistence layer for the clipper service.
//!
//! This crate provides:
//! - The store mutator (per-key serialized read-modify-write with bounded
//!   conflict retries)
//! - In-memory and JSON-file storage backends
//! - Repository implementations for clips and projects
//! - Scalar preferences (identity, default project, annotation settings)
//! - JSON bundle import
//!
//! ## Example
//!
//! ```rust,ignore
//! use clipper_store::{Clip, Store};
//!
//! #[tokio::main]
//! async fn main() -> clipper_store::Result<()> {
//!     let store = Store::in_memory();
//!     store
//!         .clips
//!         .insert_head(Clip::pending("https://example.com", "Hello", None, None))
//!         .await?;
//!     println!("{} clip(s)", store.clips.list().await?.len());
//!     Ok(())
//! }
//! ```

pub mod clips;
pub mod file_backend;
pub mod import;
pub mod memory;
pub mod mutator;
pub mod preferences;
pub mod projects;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

// Re-export core types
pub use clipper_core::*;

pub use clips::{ClipEdit, ClipRepository};
pub use file_backend::JsonFileBackend;
pub use import::ImportSummary;
pub use memory::MemoryBackend;
pub use mutator::StoreMutator;
pub use preferences::{default_project_key, Preferences, StoredIdentityProvider};
pub use projects::{ProjectDeletion, ProjectRepository};

/// Store handle bundling every repository over one backend.
///
/// All repositories share a single [`StoreMutator`], so writes to the same
/// key from any of them are serialized against each other.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StorageBackend>,
    /// Serialized access to raw keys.
    pub mutator: StoreMutator,
    /// Clip collection.
    pub clips: ClipRepository,
    /// Project collection.
    pub projects: ProjectRepository,
    /// Scalar settings.
    pub preferences: Preferences,
}

impl Store {
    /// Create a store over `backend` with the default write-attempt bound.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::from_mutator(StoreMutator::new(backend))
    }

    /// Create a store with a custom write-attempt bound.
    pub fn with_write_attempts(backend: Arc<dyn StorageBackend>, attempts: u32) -> Self {
        Self::from_mutator(StoreMutator::with_max_attempts(backend, attempts))
    }

    fn from_mutator(mutator: StoreMutator) -> Self {
        Self {
            backend: mutator.backend().clone(),
            clips: ClipRepository::new(mutator.clone()),
            projects: ProjectRepository::new(mutator.clone()),
            preferences: Preferences::new(mutator.clone()),
            mutator,
        }
    }

    /// Store backed by a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Open the store described by `config`: a JSON file when a path is set,
    /// memory otherwise.
    pub async fn open(config: &ServiceConfig) -> Result<Self> {
        let backend: Arc<dyn StorageBackend> = match &config.store_path {
            Some(path) => Arc::new(JsonFileBackend::open(path.clone()).await?),
            None => {
                info!("No store path configured, using in-memory store");
                Arc::new(MemoryBackend::new())
            }
        };
        Ok(Self::with_write_attempts(backend, config.write_attempts))
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// Change notifications from the underlying backend.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.backend.subscribe()
    }

    /// Identity provider reading the persisted sign-in state.
    pub fn identity_provider(&self) -> StoredIdentityProvider {
        StoredIdentityProvider::new(self.preferences.clone())
    }
}
