//! In-process collaborators for tests and headless runs.
//!
//! Each fake records what it was asked to do so tests can assert on it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use clipper_core::{
    AuditSink, BrowsingContext, CaptureTarget, Clip, Error, MenuEntry, MenuSurface, Result,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// BROWSING CONTEXT
// =============================================================================

/// Browsing context with scripted tabs and selections.
#[derive(Default)]
pub struct FakeBrowser {
    active: Mutex<Option<CaptureTarget>>,
    selections: Mutex<HashMap<i64, String>>,
    fail_extraction: AtomicBool,
    extractions: AtomicUsize,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active(self, target: CaptureTarget) -> Self {
        *lock(&self.active) = Some(target);
        self
    }

    pub fn with_selection(self, tab_id: i64, text: impl Into<String>) -> Self {
        self.set_selection(tab_id, text);
        self
    }

    /// Make every extraction fail.
    pub fn failing_extraction(self) -> Self {
        self.fail_extraction.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_selection(&self, tab_id: i64, text: impl Into<String>) {
        lock(&self.selections).insert(tab_id, text.into());
    }

    pub fn extraction_count(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowsingContext for FakeBrowser {
    async fn active_target(&self) -> Result<Option<CaptureTarget>> {
        Ok(lock(&self.active).clone())
    }

    async fn extract_selection_text(&self, target: &CaptureTarget) -> Result<String> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_extraction.load(Ordering::SeqCst) {
            return Err(Error::Selection(format!(
                "Cannot read selection in tab {}",
                target.tab_id
            )));
        }
        Ok(lock(&self.selections)
            .get(&target.tab_id)
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// TRIGGER SURFACE
// =============================================================================

/// Menu surface keeping entries in memory.
///
/// Creating an id that already exists fails with
/// [`Error::DuplicateMenuEntry`]. "Sticky" entries survive `clear`, which is
/// how a surface that lags behind its own removals behaves.
#[derive(Default)]
pub struct RecordingMenuSurface {
    entries: Mutex<Vec<MenuEntry>>,
    sticky: Mutex<Vec<MenuEntry>>,
    failing_ids: Mutex<HashSet<String>>,
    create_delay: Mutex<Duration>,
    clears: AtomicUsize,
    creates: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingMenuSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `entry` on the surface across clears.
    pub fn with_sticky(self, entry: MenuEntry) -> Self {
        lock(&self.entries).push(entry.clone());
        lock(&self.sticky).push(entry);
        self
    }

    /// Fail creation of `id` with a non-duplicate error.
    pub fn failing_on(self, id: impl Into<String>) -> Self {
        lock(&self.failing_ids).insert(id.into());
        self
    }

    /// Delay every creation, widening the window for overlapping builds.
    pub fn with_create_delay(self, delay: Duration) -> Self {
        *lock(&self.create_delay) = delay;
        self
    }

    pub fn entries(&self) -> Vec<MenuEntry> {
        lock(&self.entries).clone()
    }

    pub fn entry_ids(&self) -> Vec<String> {
        lock(&self.entries).iter().map(|e| e.id.clone()).collect()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Highest number of `create` calls observed running at once.
    pub fn max_concurrent_creates(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MenuSurface for RecordingMenuSurface {
    async fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        let sticky = lock(&self.sticky).clone();
        *lock(&self.entries) = sticky;
        Ok(())
    }

    async fn create(&self, entry: &MenuEntry) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *lock(&self.create_delay);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }

        let result = if lock(&self.failing_ids).contains(&entry.id) {
            Err(Error::Menu(format!("Surface refused entry {}", entry.id)))
        } else {
            let mut entries = lock(&self.entries);
            if entries.iter().any(|e| e.id == entry.id) {
                Err(Error::DuplicateMenuEntry(entry.id.clone()))
            } else {
                entries.push(entry.clone());
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// =============================================================================
// AUDIT MIRROR
// =============================================================================

/// Audit sink collecting appended clips.
#[derive(Default)]
pub struct RecordingAuditSink {
    appended: Mutex<Vec<Clip>>,
    fail: AtomicBool,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn appended(&self) -> Vec<Clip> {
        lock(&self.appended).clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn append(&self, clip: &Clip) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Audit("Audit mirror unavailable".to_string()));
        }
        lock(&self.appended).push(clip.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_surface_reports_duplicates() {
        let surface = RecordingMenuSurface::new();
        let entry = MenuEntry::root("save_root", "Root");
        surface.create(&entry).await.unwrap();
        let err = surface.create(&entry).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateMenuEntry(_)));
        surface.clear().await.unwrap();
        surface.create(&entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_sticky_entries_survive_clear() {
        let surface = RecordingMenuSurface::new().with_sticky(MenuEntry::root("save_root", "R"));
        surface.clear().await.unwrap();
        assert_eq!(surface.entry_ids(), vec!["save_root"]);
    }

    #[tokio::test]
    async fn test_browser_selection_lookup() {
        let browser = FakeBrowser::new().with_selection(7, "hello");
        let text = browser
            .extract_selection_text(&CaptureTarget::new(7, "https://a"))
            .await
            .unwrap();
        assert_eq!(text, "hello");
        let none = browser
            .extract_selection_text(&CaptureTarget::new(8, "https://a"))
            .await
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(browser.extraction_count(), 2);
    }
}
