//! Core traits for clipper's external collaborators.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::events::StoreChange;
use crate::models::*;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Key-value persistence with whole-value writes and change notification.
///
/// There is no item-level update primitive: writing a key replaces its
/// entire value.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the given keys. Missing keys are absent from the returned map.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, JsonValue>>;

    /// Write every key in `items`, replacing existing values, then notify
    /// subscribers with the written key set.
    async fn set(&self, items: HashMap<String, JsonValue>) -> Result<()>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

// =============================================================================
// BROWSING CONTEXT
// =============================================================================

/// Access to the page the user is looking at.
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// The currently focused target, if any.
    async fn active_target(&self) -> Result<Option<CaptureTarget>>;

    /// Current text selection in `target`. May be empty.
    async fn extract_selection_text(&self, target: &CaptureTarget) -> Result<String>;
}

// =============================================================================
// ANNOTATION
// =============================================================================

/// Remote summarization endpoint.
#[async_trait]
pub trait SummarizationBackend: Send + Sync {
    /// Summarize and tag `text` using `api_key` for authentication.
    async fn summarize(&self, text: &str, api_key: &str) -> Result<RemoteAnnotation>;

    /// Get the model name.
    fn model_name(&self) -> &str;
}

// =============================================================================
// AUDIT MIRROR
// =============================================================================

/// Best-effort external copy of freshly captured clips.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, clip: &Clip) -> Result<()>;
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Source of the currently signed-in identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_identity(&self) -> Result<Option<Identity>>;
}

// =============================================================================
// TRIGGER SURFACE
// =============================================================================

/// External "save" entry points (a context menu).
///
/// `create` reports an id collision as `Error::DuplicateMenuEntry`, distinct
/// from every other failure.
#[async_trait]
pub trait MenuSurface: Send + Sync {
    /// Remove every entry.
    async fn clear(&self) -> Result<()>;

    /// Create one entry.
    async fn create(&self, entry: &MenuEntry) -> Result<()>;
}
