//! Reactive background service.
//!
//! Listens for storage changes and rebuilds the menu when projects, identity
//! or a default-project preference change. Dispatches menu clicks and UI save
//! requests to the capture executor, each on its own task.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use clipper_core::{
    defaults, BrowsingContext, CaptureTarget, Error, IdentityProvider, MenuSurface, Result,
    ServiceConfig, StoreChange,
};
use clipper_inference::{AnnotationResolver, OpenAISummarizer};
use clipper_store::Store;

use crate::audit::HttpAuditSink;
use crate::capture::{CaptureExecutor, CaptureOutcome, RejectReason};
use crate::menu::{MenuAction, MenuSynchronizer, RebuildOutcome};

/// Event emitted by the service.
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    Started,
    Stopped,
    /// A rebuild finished.
    MenuRebuilt { entries: usize, errors: usize },
    /// A rebuild could not read the store.
    MenuRebuildFailed { error: String },
    ClipCaptured { clip_id: String, annotated: bool },
    CaptureRejected { reason: RejectReason },
    /// The pending clip could not be stored.
    CaptureFailed { error: String },
}

/// UI request to save the current selection of the active page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSelectionRequest {
    #[serde(default)]
    pub project_id: Option<String>,
}

impl SaveSelectionRequest {
    pub fn into_project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
        }
    }
}

/// Inbound command.
#[derive(Debug)]
pub enum ServiceCommand {
    /// A trigger-surface entry was clicked. Without a target the active page
    /// is used.
    MenuClick {
        entry_id: String,
        target: Option<CaptureTarget>,
    },
    /// Save the active page's selection and reply with the outcome.
    SaveSelection {
        request: SaveSelectionRequest,
        reply: oneshot::Sender<Result<CaptureOutcome>>,
    },
    /// Rebuild the menu now.
    RefreshMenu,
}

/// Handle for controlling a running service.
pub struct ServiceHandle {
    shutdown_tx: mpsc::Sender<()>,
    command_tx: mpsc::Sender<ServiceCommand>,
    event_rx: broadcast::Receiver<ServiceEvent>,
}

impl ServiceHandle {
    /// Signal the service to shut down.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))
    }

    /// Get a receiver for service events.
    pub fn events(&self) -> broadcast::Receiver<ServiceEvent> {
        self.event_rx.resubscribe()
    }

    /// Forward a menu click. The outcome arrives as a [`ServiceEvent`].
    pub async fn menu_clicked(
        &self,
        entry_id: impl Into<String>,
        target: Option<CaptureTarget>,
    ) -> Result<()> {
        self.send(ServiceCommand::MenuClick {
            entry_id: entry_id.into(),
            target,
        })
        .await
    }

    /// Save the active selection and wait for the outcome.
    pub async fn save_selection(&self, request: SaveSelectionRequest) -> Result<CaptureOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::SaveSelection { request, reply })
            .await?;
        rx.await
            .map_err(|_| Error::Internal("Service dropped save request".into()))?
    }

    pub async fn refresh_menu(&self) -> Result<()> {
        self.send(ServiceCommand::RefreshMenu).await
    }

    async fn send(&self, command: ServiceCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| Error::Internal("Service is not running".into()))
    }
}

/// The clipper background service.
pub struct ClipperService {
    store: Store,
    identity: Arc<dyn IdentityProvider>,
    capture: Arc<CaptureExecutor>,
    menu: Arc<MenuSynchronizer>,
    event_tx: broadcast::Sender<ServiceEvent>,
}

impl ClipperService {
    /// Wire a service over `store`, reading identity from the store.
    pub fn new(
        store: Store,
        browser: Arc<dyn BrowsingContext>,
        surface: Arc<dyn MenuSurface>,
        resolver: Arc<AnnotationResolver>,
    ) -> Self {
        let identity: Arc<dyn IdentityProvider> = Arc::new(store.identity_provider());
        Self::from_executor(
            CaptureExecutor::new(store.clone(), browser, identity.clone(), resolver),
            surface,
            identity,
        )
    }

    /// Wire a service around a prepared executor.
    pub fn from_executor(
        capture: CaptureExecutor,
        surface: Arc<dyn MenuSurface>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let store = capture.store().clone();
        let menu = MenuSynchronizer::new(store.clone(), surface, identity.clone());
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            store,
            identity,
            capture: Arc::new(capture),
            menu: Arc::new(menu),
            event_tx,
        }
    }

    /// Build a service from process configuration: opens the store, uses the
    /// OpenAI-compatible summarizer from the environment and mirrors clips
    /// when an audit URL is configured.
    pub async fn from_config(
        config: &ServiceConfig,
        browser: Arc<dyn BrowsingContext>,
        surface: Arc<dyn MenuSurface>,
    ) -> Result<Self> {
        let store = Store::open(config).await?;
        let identity: Arc<dyn IdentityProvider> = Arc::new(store.identity_provider());
        let resolver = Arc::new(AnnotationResolver::new(Arc::new(OpenAISummarizer::from_env()?)));

        let mut capture = CaptureExecutor::new(store, browser, identity.clone(), resolver);
        if let Some(url) = &config.audit_url {
            info!(url = %url, "Audit mirror enabled");
            let sink = HttpAuditSink::new(url.clone(), identity.clone())?;
            capture = capture.with_audit_sink(Arc::new(sink));
        }
        Ok(Self::from_executor(capture, surface, identity))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn menu(&self) -> &Arc<MenuSynchronizer> {
        &self.menu
    }

    /// Get a receiver for service events.
    pub fn events(&self) -> broadcast::Receiver<ServiceEvent> {
        self.event_tx.subscribe()
    }

    /// Start the service and return a handle for control.
    ///
    /// The change subscription is taken before this returns, so writes made
    /// after `start` always reach the loop.
    pub fn start(self) -> ServiceHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let (command_tx, mut command_rx) = mpsc::channel(defaults::EVENT_BUS_CAPACITY);
        let event_rx = self.event_tx.subscribe();
        let mut changes = self.store.subscribe();

        let service = Arc::new(self);
        tokio::spawn(async move {
            service
                .run(&mut shutdown_rx, &mut command_rx, &mut changes)
                .await;
        });

        ServiceHandle {
            shutdown_tx,
            command_tx,
            event_rx,
        }
    }

    #[instrument(skip_all, fields(subsystem = "service", component = "loop"))]
    async fn run(
        self: &Arc<Self>,
        shutdown_rx: &mut mpsc::Receiver<()>,
        command_rx: &mut mpsc::Receiver<ServiceCommand>,
        changes: &mut broadcast::Receiver<StoreChange>,
    ) {
        info!("Clipper service started");
        let _ = self.event_tx.send(ServiceEvent::Started);

        self.spawn_rebuild();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Clipper service received shutdown signal");
                    break;
                }
                change = changes.recv() => match change {
                    Ok(change) if change.affects_menu() => {
                        debug!(keys = ?change.keys, "Menu-relevant change");
                        self.spawn_rebuild();
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Change stream lagged, rebuilding menu");
                        self.spawn_rebuild();
                    }
                    Err(RecvError::Closed) => {
                        warn!("Change stream closed");
                        break;
                    }
                },
                command = command_rx.recv() => match command {
                    Some(command) => self.spawn_command(command),
                    None => break,
                },
            }
        }

        // Let in-flight rebuilds settle so the surface is not left half-built.
        if tokio::time::timeout(Duration::from_secs(5), self.menu.wait_idle())
            .await
            .is_err()
        {
            warn!("Menu rebuild still running at shutdown");
        }
        let _ = self.event_tx.send(ServiceEvent::Stopped);
        info!("Clipper service stopped");
    }

    fn spawn_rebuild(self: &Arc<Self>) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let event = match service.menu.request_rebuild().await {
                RebuildOutcome::Coalesced => return,
                RebuildOutcome::Built(Ok(report)) => ServiceEvent::MenuRebuilt {
                    entries: report.entry_ids().count(),
                    errors: report.errors.len(),
                },
                RebuildOutcome::Built(Err(e)) => {
                    error!(error = %e, "Menu rebuild failed");
                    ServiceEvent::MenuRebuildFailed {
                        error: e.to_string(),
                    }
                }
            };
            let _ = service.event_tx.send(event);
        });
    }

    fn spawn_command(self: &Arc<Self>, command: ServiceCommand) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            match command {
                ServiceCommand::MenuClick { entry_id, target } => {
                    service.handle_click(&entry_id, target).await;
                }
                ServiceCommand::SaveSelection { request, reply } => {
                    let result = service
                        .run_capture(None, request.project_id.as_deref())
                        .await;
                    let _ = reply.send(result);
                }
                ServiceCommand::RefreshMenu => service.spawn_rebuild(),
            }
        });
    }

    async fn handle_click(&self, entry_id: &str, target: Option<CaptureTarget>) {
        let project_id = match MenuAction::from_entry_id(entry_id) {
            Some(MenuAction::SaveToProject(id)) => Some(id),
            Some(MenuAction::QuickSave) => self.quick_save_project().await,
            None => {
                debug!(entry_id, "Click on non-action entry ignored");
                return;
            }
        };
        // Errors are already reported as events.
        let _ = self.run_capture(target, project_id.as_deref()).await;
    }

    /// Default project of the current identity, unassigned when unset,
    /// dangling or unreadable.
    async fn quick_save_project(&self) -> Option<String> {
        let identity = match self.identity.current_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Identity lookup failed, quick save unassigned");
                None
            }
        };
        match self.menu.default_project(identity.as_ref()).await {
            Ok(project) => project.map(|p| p.id),
            Err(e) => {
                warn!(error = %e, "Default project lookup failed, quick save unassigned");
                None
            }
        }
    }

    async fn run_capture(
        &self,
        target: Option<CaptureTarget>,
        project_id: Option<&str>,
    ) -> Result<CaptureOutcome> {
        let result = match &target {
            Some(target) => self.capture.capture(target, project_id).await,
            None => self.capture.capture_active(project_id).await,
        };
        let event = match &result {
            Ok(CaptureOutcome::Captured { clip_id, annotated }) => ServiceEvent::ClipCaptured {
                clip_id: clip_id.clone(),
                annotated: *annotated,
            },
            Ok(CaptureOutcome::Rejected(reason)) => ServiceEvent::CaptureRejected { reason: *reason },
            Err(e) => {
                error!(error = %e, "Capture failed");
                ServiceEvent::CaptureFailed {
                    error: e.to_string(),
                }
            }
        };
        let _ = self.event_tx.send(event);
        result
    }
}
