//! Scripted summarization backend for deterministic tests.
//!
//! ```rust
//! use std::sync::Arc;
//! use clipper_inference::{mock::MockSummarizer, AnnotationResolver};
//!
//! let mock = Arc::new(MockSummarizer::new().with_reply("Short.", &["rust"]));
//! let resolver = AnnotationResolver::new(mock.clone());
//! assert_eq!(mock.call_count(), 0);
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use clipper_core::{Error, RemoteAnnotation, Result, SummarizationBackend};

/// One recorded `summarize` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub input: String,
    pub api_key: String,
    pub timestamp: std::time::Instant,
}

#[derive(Debug, Clone)]
struct MockConfig {
    reply: RemoteAnnotation,
    fail: bool,
    latency: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            reply: RemoteAnnotation {
                summary: "Mock summary.".to_string(),
                tags: vec!["mock".to_string(), "test".to_string(), "reply".to_string()],
            },
            fail: false,
            latency: Duration::ZERO,
        }
    }
}

/// Summarizer returning a fixed reply and logging every call.
#[derive(Clone, Default)]
pub struct MockSummarizer {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `summary` and `tags`.
    pub fn with_reply(mut self, summary: &str, tags: &[&str]) -> Self {
        Arc::make_mut(&mut self.config).reply = RemoteAnnotation {
            summary: summary.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        };
        self
    }

    /// Fail every call with an inference error.
    pub fn failing(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail = true;
        self
    }

    /// Delay every reply.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        Arc::make_mut(&mut self.config).latency = latency;
        self
    }

    /// All logged calls, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().map(|log| log.len()).unwrap_or(0)
    }
}

#[async_trait]
impl SummarizationBackend for MockSummarizer {
    async fn summarize(&self, text: &str, api_key: &str) -> Result<RemoteAnnotation> {
        if let Ok(mut log) = self.call_log.lock() {
            log.push(MockCall {
                input: text.to_string(),
                api_key: api_key.to_string(),
                timestamp: std::time::Instant::now(),
            });
        }
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        if self.config.fail {
            return Err(Error::Inference("Mock failure".to_string()));
        }
        Ok(self.config.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
