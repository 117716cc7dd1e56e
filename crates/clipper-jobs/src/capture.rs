//! Capture executor: selection → pending clip → annotation write-back.
//!
//! The insert of the pending clip is the commit point. Everything after it
//! (audit mirror, annotation, write-back) is best effort and can only degrade
//! the result, never undo the capture.

use std::sync::Arc;
use std::time::Instant;

use reqwest::Url;
use tracing::{debug, error, info, instrument, warn};

use clipper_core::{
    defaults, Annotation, AnnotationConfig, AuditSink, BrowsingContext, CaptureTarget, Clip,
    Identity, IdentityProvider, Result,
};
use clipper_inference::AnnotationResolver;
use clipper_store::Store;

/// Why a capture was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Page URL is unparsable or its scheme cannot be captured from.
    IneligibleTarget,
    /// Selection is empty, blank or could not be read.
    EmptySelection,
    /// No page is focused.
    NoActiveTarget,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IneligibleTarget => write!(f, "ineligible target"),
            Self::EmptySelection => write!(f, "empty selection"),
            Self::NoActiveTarget => write!(f, "no active target"),
        }
    }
}

/// Result of one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// A clip was stored. `annotated` is false when the annotation could not
    /// be written back; the clip then stays pending.
    Captured { clip_id: String, annotated: bool },
    /// Nothing was stored.
    Rejected(RejectReason),
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Captured { .. })
    }

    pub fn clip_id(&self) -> Option<&str> {
        match self {
            Self::Captured { clip_id, .. } => Some(clip_id),
            Self::Rejected(_) => None,
        }
    }
}

/// Whether `url` uses a scheme a capture may target.
pub fn is_capturable(url: &str) -> bool {
    Url::parse(url)
        .map(|u| defaults::CAPTURE_SCHEMES.contains(&u.scheme()))
        .unwrap_or(false)
}

/// Runs captures against a store.
pub struct CaptureExecutor {
    store: Store,
    browser: Arc<dyn BrowsingContext>,
    identity: Arc<dyn IdentityProvider>,
    resolver: Arc<AnnotationResolver>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl CaptureExecutor {
    pub fn new(
        store: Store,
        browser: Arc<dyn BrowsingContext>,
        identity: Arc<dyn IdentityProvider>,
        resolver: Arc<AnnotationResolver>,
    ) -> Self {
        Self {
            store,
            browser,
            identity,
            resolver,
            audit: None,
        }
    }

    /// Mirror every new clip to `sink`.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Capture from the currently focused page.
    pub async fn capture_active(&self, project_id: Option<&str>) -> Result<CaptureOutcome> {
        let target = match self.browser.active_target().await {
            Ok(Some(target)) => target,
            Ok(None) => return Ok(CaptureOutcome::Rejected(RejectReason::NoActiveTarget)),
            Err(e) => {
                warn!(error = %e, "Failed to resolve active target");
                return Ok(CaptureOutcome::Rejected(RejectReason::NoActiveTarget));
            }
        };
        self.capture(&target, project_id).await
    }

    /// Capture the selection in `target` into `project_id` (unassigned when
    /// `None` or blank).
    ///
    /// Fails only when the pending clip cannot be stored.
    #[instrument(skip(self, target), fields(subsystem = "capture", component = "executor", op = "capture", tab_id = target.tab_id))]
    pub async fn capture(
        &self,
        target: &CaptureTarget,
        project_id: Option<&str>,
    ) -> Result<CaptureOutcome> {
        let started = Instant::now();

        if !is_capturable(&target.url) {
            debug!(url = %target.url, "Target not capturable");
            return Ok(CaptureOutcome::Rejected(RejectReason::IneligibleTarget));
        }

        let selected = match self.browser.extract_selection_text(target).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Selection extraction failed, treating as empty");
                String::new()
            }
        };
        if selected.is_empty() {
            debug!("Empty selection, nothing to capture");
            return Ok(CaptureOutcome::Rejected(RejectReason::EmptySelection));
        }

        let identity = self.current_identity().await;
        let project_id = project_id
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let clip = Clip::pending(&target.url, selected, project_id, identity.as_ref());
        let clip_id = clip.id.clone();

        self.store.clips.insert_head(clip.clone()).await?;
        info!(clip_id = %clip_id, "Pending clip stored");

        self.spawn_audit(clip.clone());

        let config = self.annotation_config().await;
        let annotation = self.resolve_isolated(clip.selected_text.clone(), config).await;

        let annotated = match self.store.clips.apply_annotation(&clip_id, &annotation).await {
            Ok(true) => true,
            Ok(false) => {
                warn!(clip_id = %clip_id, "Clip gone or no longer pending, annotation dropped");
                false
            }
            Err(e) => {
                error!(clip_id = %clip_id, error = %e, "Annotation write-back failed, clip stays pending");
                false
            }
        };

        info!(
            clip_id = %clip_id,
            ai_source = %annotation.source,
            annotated,
            duration_ms = started.elapsed().as_millis() as u64,
            "Capture complete"
        );
        Ok(CaptureOutcome::Captured { clip_id, annotated })
    }

    async fn current_identity(&self) -> Option<Identity> {
        match self.identity.current_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(error = %e, "Identity lookup failed, capturing anonymously");
                None
            }
        }
    }

    async fn annotation_config(&self) -> AnnotationConfig {
        match self.store.preferences.annotation_config().await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to read annotation settings, using defaults");
                AnnotationConfig::default()
            }
        }
    }

    /// Run the resolver on its own task so a panic inside it turns into the
    /// error annotation instead of unwinding through the capture.
    async fn resolve_isolated(&self, text: String, config: AnnotationConfig) -> Annotation {
        let resolver = Arc::clone(&self.resolver);
        match tokio::spawn(async move { resolver.resolve(&text, &config).await }).await {
            Ok(annotation) => annotation,
            Err(e) => {
                error!(error = %e, "Annotation resolver failed");
                Annotation::error()
            }
        }
    }

    fn spawn_audit(&self, clip: Clip) {
        let Some(sink) = self.audit.clone() else {
            return;
        };
        tokio::spawn(async move {
            match sink.append(&clip).await {
                Ok(()) => debug!(clip_id = %clip.id, "Clip mirrored to audit sink"),
                Err(e) => warn!(clip_id = %clip.id, error = %e, "Audit mirror failed"),
            }
        });
    }
}
