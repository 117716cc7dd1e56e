//! Menu synchronizer: rebuilds the trigger surface from the store.
//!
//! Rebuilds are single-flight with coalescing. A request arriving while a
//! build runs does not start a second build; it marks one follow-up, and the
//! running caller performs exactly one more build when it finishes. Any
//! number of requests during one build collapse into that single follow-up.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use clipper_core::{
    defaults, Error, Identity, IdentityProvider, MenuEntry, MenuSurface, Project, Result,
};
use clipper_store::Store;

/// Rebuild state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Building,
    /// Building, with one more build requested.
    BuildingQueued,
}

/// What a menu entry does when clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// Save into the identity's default project.
    QuickSave,
    /// Save into the given project.
    SaveToProject(String),
}

impl MenuAction {
    /// Map a clicked entry id to its action. Root, separator and unknown ids
    /// have none.
    pub fn from_entry_id(id: &str) -> Option<Self> {
        if id == defaults::MENU_QUICK_ID {
            return Some(Self::QuickSave);
        }
        id.strip_prefix(defaults::MENU_PROJECT_PREFIX)
            .filter(|pid| !pid.is_empty())
            .map(|pid| Self::SaveToProject(pid.to_string()))
    }
}

/// Outcome of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuBuildReport {
    /// Ids created in this build.
    pub created: Vec<String>,
    /// Ids that already existed. Harmless.
    pub duplicates: Vec<String>,
    /// Ids whose creation failed, with the error text.
    pub errors: Vec<(String, String)>,
    /// The root entry could not be created, so no children were attempted.
    pub aborted: bool,
}

impl MenuBuildReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.aborted
    }

    /// Ids present on the surface after the build.
    pub fn entry_ids(&self) -> impl Iterator<Item = &String> {
        self.created.iter().chain(self.duplicates.iter())
    }
}

/// Result of a rebuild request.
#[derive(Debug)]
pub enum RebuildOutcome {
    /// This caller ran the build(s); the report is from the last one.
    Built(Result<MenuBuildReport>),
    /// A build was already running; it will run once more on our behalf.
    Coalesced,
}

/// Resets the state to idle if a build is abandoned mid-way (the future was
/// dropped or the build panicked).
struct BuildGuard<'a> {
    state: &'a watch::Sender<SyncState>,
    armed: bool,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(SyncState::Idle);
        }
    }
}

/// Keeps the trigger surface in sync with projects, identity and the default
/// project preference.
pub struct MenuSynchronizer {
    store: Store,
    surface: Arc<dyn MenuSurface>,
    identity: Arc<dyn IdentityProvider>,
    state: watch::Sender<SyncState>,
}

impl MenuSynchronizer {
    pub fn new(
        store: Store,
        surface: Arc<dyn MenuSurface>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::Idle);
        Self {
            store,
            surface,
            identity,
            state,
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Wait until no build is running or queued.
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = rx.wait_for(|s| *s == SyncState::Idle).await;
    }

    /// Request a rebuild.
    ///
    /// When idle, builds inline and keeps building while follow-ups are
    /// queued. Otherwise marks a follow-up and returns
    /// [`RebuildOutcome::Coalesced`] at once.
    pub async fn request_rebuild(&self) -> RebuildOutcome {
        let mut start = false;
        self.state.send_modify(|s| match s {
            SyncState::Idle => {
                *s = SyncState::Building;
                start = true;
            }
            SyncState::Building => *s = SyncState::BuildingQueued,
            SyncState::BuildingQueued => {}
        });
        if !start {
            debug!(subsystem = "menu", "Rebuild coalesced into running build");
            return RebuildOutcome::Coalesced;
        }

        let mut guard = BuildGuard {
            state: &self.state,
            armed: true,
        };
        let mut builds = 0u32;
        loop {
            let result = self.build().await;
            builds += 1;

            let mut again = false;
            self.state.send_modify(|s| {
                if *s == SyncState::BuildingQueued {
                    *s = SyncState::Building;
                    again = true;
                } else {
                    *s = SyncState::Idle;
                }
            });
            if !again {
                guard.armed = false;
                if builds > 1 {
                    debug!(subsystem = "menu", builds, "Coalesced rebuilds drained");
                }
                return RebuildOutcome::Built(result);
            }
        }
    }

    /// The identity's default project, if set and still among its projects.
    pub async fn default_project(&self, identity: Option<&Identity>) -> Result<Option<Project>> {
        let owned = self.owned_projects(identity).await?;
        self.resolve_default(identity, &owned).await
    }

    async fn owned_projects(&self, identity: Option<&Identity>) -> Result<Vec<Project>> {
        let uid = identity.map(|i| i.uid.as_str()).unwrap_or("");
        self.store.projects.list_for_owner(uid).await
    }

    async fn resolve_default(
        &self,
        identity: Option<&Identity>,
        owned: &[Project],
    ) -> Result<Option<Project>> {
        let default_id = self.store.preferences.default_project_id(identity).await?;
        Ok(default_id.and_then(|id| owned.iter().find(|p| p.id == id).cloned()))
    }

    /// One full rebuild of the surface.
    #[instrument(skip(self), fields(subsystem = "menu", component = "synchronizer", op = "build"))]
    async fn build(&self) -> Result<MenuBuildReport> {
        let started = Instant::now();

        let identity = match self.identity.current_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Identity lookup failed, building anonymous menu");
                None
            }
        };
        let projects = self.owned_projects(identity.as_ref()).await?;
        let default = self.resolve_default(identity.as_ref(), &projects).await?;

        if let Err(e) = self.surface.clear().await {
            warn!(error = %e, "Failed to clear menu surface");
        }

        let mut report = MenuBuildReport::default();
        let root = MenuEntry::root(defaults::MENU_ROOT_ID, defaults::MENU_ROOT_TITLE);
        if !self.create_entry(&root, &mut report).await {
            report.aborted = true;
            warn!("Root menu entry could not be created, skipping children");
            return Ok(report);
        }

        let quick_title = match &default {
            Some(project) => format!("{}{}", defaults::MENU_QUICK_TITLE_PREFIX, project.name),
            None => defaults::MENU_QUICK_NO_DEFAULT_TITLE.to_string(),
        };
        let mut children = vec![
            MenuEntry::child(defaults::MENU_QUICK_ID, defaults::MENU_ROOT_ID, quick_title),
            MenuEntry::separator(defaults::MENU_SEPARATOR_ID, defaults::MENU_ROOT_ID),
        ];
        children.extend(projects.iter().map(|p| {
            MenuEntry::child(
                format!("{}{}", defaults::MENU_PROJECT_PREFIX, p.id),
                defaults::MENU_ROOT_ID,
                format!("{}{}", defaults::MENU_PROJECT_TITLE_PREFIX, p.name),
            )
        }));
        for entry in &children {
            self.create_entry(entry, &mut report).await;
        }

        info!(
            entry_count = report.created.len() + report.duplicates.len(),
            project_count = projects.len(),
            duplicates = report.duplicates.len(),
            errors = report.errors.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Menu rebuilt"
        );
        Ok(report)
    }

    /// Create one entry, recording the result. Returns whether the entry is
    /// on the surface afterwards.
    async fn create_entry(&self, entry: &MenuEntry, report: &mut MenuBuildReport) -> bool {
        match self.surface.create(entry).await {
            Ok(()) => {
                report.created.push(entry.id.clone());
                true
            }
            Err(Error::DuplicateMenuEntry(_)) => {
                debug!(entry_id = %entry.id, "Menu entry already exists");
                report.duplicates.push(entry.id.clone());
                true
            }
            Err(e) => {
                warn!(entry_id = %entry.id, error = %e, "Menu entry creation failed");
                report.errors.push((entry.id.clone(), e.to_string()));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMenuSurface;

    fn synchronizer(surface: Arc<RecordingMenuSurface>) -> (MenuSynchronizer, Store) {
        let store = Store::in_memory();
        let sync = MenuSynchronizer::new(store.clone(), surface, Arc::new(store.identity_provider()));
        (sync, store)
    }

    fn built(outcome: RebuildOutcome) -> MenuBuildReport {
        match outcome {
            RebuildOutcome::Built(result) => result.unwrap(),
            RebuildOutcome::Coalesced => panic!("expected a build"),
        }
    }

    #[test]
    fn test_menu_action_from_entry_id() {
        assert_eq!(MenuAction::from_entry_id("save_quick"), Some(MenuAction::QuickSave));
        assert_eq!(
            MenuAction::from_entry_id("save_p_reading-x1y2"),
            Some(MenuAction::SaveToProject("reading-x1y2".into()))
        );
        assert_eq!(MenuAction::from_entry_id("save_p_"), None);
        assert_eq!(MenuAction::from_entry_id("save_root"), None);
        assert_eq!(MenuAction::from_entry_id("save_sep"), None);
        assert_eq!(MenuAction::from_entry_id("other"), None);
    }

    #[tokio::test]
    async fn test_build_lists_owned_projects_with_default() {
        let surface = Arc::new(RecordingMenuSurface::new());
        let (sync, store) = synchronizer(surface.clone());
        let me = Identity::new("u1", "");
        store.preferences.set_identity(Some(&me)).await.unwrap();
        let alpha = store.projects.create("Alpha", Some(&me)).await.unwrap();
        store.projects.create("Theirs", Some(&Identity::new("u2", ""))).await.unwrap();
        store
            .preferences
            .set_default_project(Some(&me), Some(&alpha.id))
            .await
            .unwrap();

        let report = built(sync.request_rebuild().await);
        assert!(report.is_clean());
        assert_eq!(
            surface.entry_ids(),
            vec![
                "save_root".to_string(),
                "save_quick".to_string(),
                "save_sep".to_string(),
                format!("save_p_{}", alpha.id),
            ]
        );
        let entries = surface.entries();
        assert_eq!(entries[1].title, "Save to default: Alpha");
        assert_eq!(entries[3].title, "Save to: Alpha");
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_sign_in_without_email_lists_own_projects() {
        let surface = Arc::new(RecordingMenuSurface::new());
        let (sync, store) = synchronizer(surface.clone());
        let me = Identity::new("u1", "");
        let mine = store.projects.create("Mine", Some(&me)).await.unwrap();
        store.projects.create("Anon", None).await.unwrap();
        store
            .mutator
            .write_value(
                defaults::IDENTITY_KEY,
                &serde_json::json!({"uid": "u1", "email": null}),
            )
            .await
            .unwrap();

        built(sync.request_rebuild().await);
        assert_eq!(surface.entry_ids()[3], format!("save_p_{}", mine.id));
        assert_eq!(surface.entry_ids().len(), 4);
    }

    #[tokio::test]
    async fn test_dangling_default_shows_no_default_label() {
        let surface = Arc::new(RecordingMenuSurface::new());
        let (sync, store) = synchronizer(surface.clone());
        store
            .preferences
            .set_default_project(None, Some("deleted-project"))
            .await
            .unwrap();

        built(sync.request_rebuild().await);
        assert_eq!(surface.entries()[1].title, defaults::MENU_QUICK_NO_DEFAULT_TITLE);
        assert!(sync.default_project(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let surface = Arc::new(RecordingMenuSurface::new());
        let (sync, store) = synchronizer(surface.clone());
        store.projects.create("Alpha", None).await.unwrap();
        store.projects.create("Beta", None).await.unwrap();

        built(sync.request_rebuild().await);
        let first = surface.entries();
        built(sync.request_rebuild().await);
        assert_eq!(surface.entries(), first);
        assert_eq!(first.len(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_entries_are_benign() {
        let stale = MenuEntry::child("save_quick", "save_root", "stale");
        let surface = Arc::new(RecordingMenuSurface::new().with_sticky(stale));
        let (sync, _store) = synchronizer(surface.clone());

        let report = built(sync.request_rebuild().await);
        assert!(report.is_clean());
        assert_eq!(report.duplicates, vec!["save_quick".to_string()]);
        assert_eq!(report.entry_ids().count(), 3);
    }

    #[tokio::test]
    async fn test_root_failure_aborts_build() {
        let surface = Arc::new(RecordingMenuSurface::new().failing_on("save_root"));
        let (sync, store) = synchronizer(surface.clone());
        store.projects.create("Alpha", None).await.unwrap();

        let report = built(sync.request_rebuild().await);
        assert!(report.aborted);
        assert_eq!(report.errors.len(), 1);
        assert!(surface.entries().is_empty());
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_child_failure_is_reported_and_build_continues() {
        let surface = Arc::new(RecordingMenuSurface::new().failing_on("save_sep"));
        let (sync, store) = synchronizer(surface.clone());
        store.projects.create("Alpha", None).await.unwrap();

        let report = built(sync.request_rebuild().await);
        assert!(!report.aborted);
        assert_eq!(report.errors[0].0, "save_sep");
        assert_eq!(surface.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let surface = Arc::new(
            RecordingMenuSurface::new().with_create_delay(std::time::Duration::from_millis(5)),
        );
        let (sync, _store) = synchronizer(surface.clone());

        let (a, b, c) = tokio::join!(
            sync.request_rebuild(),
            sync.request_rebuild(),
            sync.request_rebuild()
        );
        let built_count = [&a, &b, &c]
            .iter()
            .filter(|o| matches!(o, RebuildOutcome::Built(_)))
            .count();
        assert_eq!(built_count, 1);
        // One build plus exactly one follow-up.
        assert_eq!(surface.clear_count(), 2);
        assert_eq!(surface.max_concurrent_creates(), 1);
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_dropped_build_resets_state() {
        let surface = Arc::new(
            RecordingMenuSurface::new().with_create_delay(std::time::Duration::from_secs(60)),
        );
        let (sync, _store) = synchronizer(surface);
        let _ = tokio::time::timeout(std::time::Duration::from_millis(10), sync.request_rebuild())
            .await;
        assert_eq!(sync.state(), SyncState::Idle);
        sync.wait_idle().await;
    }
}
