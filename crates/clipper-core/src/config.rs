//! Process-level service configuration.
//!
//! Runtime annotation settings (API key, mock toggle, disable toggle) are not
//! here: they live in the store and are re-read on every capture.

use std::path::PathBuf;

use crate::defaults;

/// Configuration for the clipper background service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// JSON file backing the store. `None` keeps everything in memory.
    pub store_path: Option<PathBuf>,
    /// Read-modify-write attempts before a store mutation gives up.
    pub write_attempts: u32,
    /// Audit mirror endpoint. `None` disables mirroring.
    pub audit_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            write_attempts: defaults::STORE_WRITE_ATTEMPTS,
            audit_url: None,
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CLIPPER_STORE_PATH` | (unset) | JSON store file; in-memory when unset |
    /// | `CLIPPER_WRITE_ATTEMPTS` | `3` | Read-modify-write attempt bound |
    /// | `CLIPPER_AUDIT_URL` | (unset) | Audit mirror endpoint |
    pub fn from_env() -> Self {
        let store_path = std::env::var("CLIPPER_STORE_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let write_attempts = std::env::var("CLIPPER_WRITE_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults::STORE_WRITE_ATTEMPTS)
            .max(1);

        let audit_url = std::env::var("CLIPPER_AUDIT_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Self {
            store_path,
            write_attempts,
            audit_url,
        }
    }

    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_env()
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn with_write_attempts(mut self, attempts: u32) -> Self {
        self.write_attempts = attempts.max(1);
        self
    }

    pub fn with_audit_url(mut self, url: impl Into<String>) -> Self {
        self.audit_url = Some(url.into());
        self
    }
}
