//! Annotation resolver: an ordered chain of tiers, first resolution wins.
//!
//! The standard chain is
//!
//! 1. [`EmptyTier`]: input normalized to nothing
//! 2. [`DisabledTier`]: annotation switched off, heuristic result
//! 3. [`RemoteTier`]: remote summarization when an API key is configured
//! 4. [`LocalTier`]: heuristic result labelled `mock` or `fallback`
//!
//! A tier that cannot answer passes to the next one. The last tier always
//! answers, so resolving never fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use clipper_core::{
    defaults, normalize_tags, pad_with_fillers, AiSource, Annotation, AnnotationConfig,
    SummarizationBackend,
};

use crate::heuristic;

/// One strategy in the resolver chain.
#[async_trait]
pub trait AnnotationTier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Resolve already-normalized `text`, or `None` to pass to the next tier.
    async fn try_resolve(&self, text: &str, config: &AnnotationConfig) -> Option<Annotation>;
}

/// Resolves input that normalizes to nothing.
pub struct EmptyTier;

#[async_trait]
impl AnnotationTier for EmptyTier {
    fn name(&self) -> &'static str {
        "empty"
    }

    async fn try_resolve(&self, text: &str, _config: &AnnotationConfig) -> Option<Annotation> {
        text.is_empty().then(Annotation::empty)
    }
}

/// Heuristic result when annotation is disabled.
pub struct DisabledTier;

#[async_trait]
impl AnnotationTier for DisabledTier {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn try_resolve(&self, text: &str, config: &AnnotationConfig) -> Option<Annotation> {
        config
            .ai_disabled
            .then(|| heuristic_annotation(text, AiSource::Disabled))
    }
}

/// Remote summarization. Passes when no key is configured and on any
/// failure: transport error, timeout, error status, unparsable reply or
/// empty summary.
pub struct RemoteTier {
    backend: Arc<dyn SummarizationBackend>,
    timeout: Duration,
}

impl RemoteTier {
    pub fn new(backend: Arc<dyn SummarizationBackend>) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(defaults::ANNOTATION_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl AnnotationTier for RemoteTier {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn try_resolve(&self, text: &str, config: &AnnotationConfig) -> Option<Annotation> {
        let api_key = config.api_key()?;
        let input = cap_input(text);

        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.timeout, self.backend.summarize(input, api_key)).await;
        let remote = match outcome {
            Ok(Ok(remote)) => remote,
            Ok(Err(e)) => {
                warn!(
                    subsystem = "inference",
                    component = "resolver",
                    model = self.backend.model_name(),
                    error = %e,
                    "Remote annotation failed, using local tier"
                );
                return None;
            }
            Err(_) => {
                warn!(
                    subsystem = "inference",
                    component = "resolver",
                    model = self.backend.model_name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Remote annotation timed out, using local tier"
                );
                return None;
            }
        };

        let summary = remote.summary.trim();
        if summary.is_empty() {
            warn!(
                subsystem = "inference",
                component = "resolver",
                "Remote annotation returned an empty summary, using local tier"
            );
            return None;
        }

        let mut tags = normalize_tags(&remote.tags);
        tags.truncate(defaults::MAX_TAGS);
        top_up_tags(&mut tags, text);

        debug!(
            duration_ms = started.elapsed().as_millis() as u64,
            "Remote annotation accepted"
        );
        Some(Annotation::new(
            heuristic::truncate_chars(summary, defaults::REMOTE_SUMMARY_MAX_CHARS),
            tags,
            AiSource::Remote,
        ))
    }
}

/// Heuristic result standing in for the remote tier. Always resolves.
pub struct LocalTier;

#[async_trait]
impl AnnotationTier for LocalTier {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn try_resolve(&self, text: &str, config: &AnnotationConfig) -> Option<Annotation> {
        let source = if config.use_mock_if_fail {
            AiSource::Mock
        } else {
            AiSource::Fallback
        };
        Some(heuristic_annotation(text, source))
    }
}

/// Ordered tier chain.
pub struct AnnotationResolver {
    tiers: Vec<Box<dyn AnnotationTier>>,
}

impl AnnotationResolver {
    /// Standard chain with `backend` as the remote tier.
    pub fn new(backend: Arc<dyn SummarizationBackend>) -> Self {
        Self::with_tiers(vec![
            Box::new(EmptyTier),
            Box::new(DisabledTier),
            Box::new(RemoteTier::new(backend)),
            Box::new(LocalTier),
        ])
    }

    /// Standard chain without a remote tier.
    pub fn local_only() -> Self {
        Self::with_tiers(vec![
            Box::new(EmptyTier),
            Box::new(DisabledTier),
            Box::new(LocalTier),
        ])
    }

    pub fn with_tiers(tiers: Vec<Box<dyn AnnotationTier>>) -> Self {
        Self { tiers }
    }

    /// Names of the configured tiers, in order.
    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Resolve `text` into a summary, tags and source label.
    ///
    /// Never fails. A chain in which no tier answers yields the heuristic
    /// result labelled `fallback`.
    #[instrument(skip(self, text, config), fields(subsystem = "inference", component = "resolver", op = "resolve", input_len = text.len()))]
    pub async fn resolve(&self, text: &str, config: &AnnotationConfig) -> Annotation {
        let normalized = heuristic::normalize_text(text);
        for tier in &self.tiers {
            if let Some(annotation) = tier.try_resolve(&normalized, config).await {
                info!(
                    tier = tier.name(),
                    ai_source = %annotation.source,
                    tag_count = annotation.tags.len(),
                    "Annotation resolved"
                );
                return annotation;
            }
            debug!(tier = tier.name(), "Tier passed");
        }
        if normalized.is_empty() {
            return Annotation::empty();
        }
        heuristic_annotation(&normalized, AiSource::Fallback)
    }
}

fn heuristic_annotation(text: &str, source: AiSource) -> Annotation {
    let local = heuristic::annotate(text);
    Annotation::new(local.summary, local.tags, source)
}

/// First [`defaults::ANNOTATION_INPUT_CAP`] characters of `text`.
fn cap_input(text: &str) -> &str {
    match text.char_indices().nth(defaults::ANNOTATION_INPUT_CAP) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Bring remote tags up to the minimum from local keywords, then fillers.
fn top_up_tags(tags: &mut Vec<String>, text: &str) {
    for keyword in heuristic::keywords(text) {
        if tags.len() >= defaults::MIN_TAGS {
            return;
        }
        if !tags.contains(&keyword) {
            tags.push(keyword);
        }
    }
    pad_with_fillers(tags, defaults::MIN_TAGS);
}
