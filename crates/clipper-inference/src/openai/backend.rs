//! OpenAI-compatible summarization backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use clipper_core::{defaults, Error, RemoteAnnotation, Result, SummarizationBackend};

use super::error::{to_clipper_error, OpenAIErrorCode};
use super::types::*;
use crate::parse::parse_annotation;

/// Instructions sent as the system message.
pub const SYSTEM_PROMPT: &str = "You are concise. Return a compact summary (1-2 sentences) \
and 3-5 short, lowercase tags. Respond ONLY valid JSON: {\"summary\": string, \"tags\": string[]}.";

/// Wrap the clipped text in the user message.
pub fn user_prompt(text: &str) -> String {
    format!(
        "Text:\n{}\n\nReturn JSON with keys: summary, tags.",
        text
    )
}

/// Configuration for the OpenAI-compatible summarizer.
///
/// The API key is not part of it: it is a runtime setting read from the
/// store on every capture and passed per call.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// Model to use for generation.
    pub gen_model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OPENAI_URL.to_string(),
            gen_model: defaults::GEN_MODEL.to_string(),
            temperature: defaults::GEN_TEMPERATURE,
            timeout_seconds: defaults::ANNOTATION_TIMEOUT_SECS,
        }
    }
}

impl OpenAIConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
    /// | `OPENAI_GEN_MODEL` | `gpt-4o-mini` |
    /// | `OPENAI_TIMEOUT` | `12` |
    pub fn from_env() -> Self {
        let fallback = Self::default();
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(fallback.base_url),
            gen_model: std::env::var("OPENAI_GEN_MODEL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(fallback.gen_model),
            temperature: fallback.temperature,
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(fallback.timeout_seconds),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.gen_model = model.into();
        self
    }

    pub fn with_timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs.max(1);
        self
    }
}

/// Summarizer calling `POST {base_url}/chat/completions`.
pub struct OpenAISummarizer {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAISummarizer {
    /// Create a new summarizer with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            url = %config.base_url,
            model = %config.gen_model,
            timeout_secs = config.timeout_seconds,
            "Initializing OpenAI summarizer"
        );

        Ok(Self { client, config })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OpenAIConfig::default())
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    fn build_request(&self, endpoint: &str, api_key: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        self.client
            .post(&url)
            .bearer_auth(api_key)
            .header("Content-Type", "application/json")
    }
}

#[async_trait]
impl SummarizationBackend for OpenAISummarizer {
    #[instrument(skip(self, text, api_key), fields(subsystem = "inference", component = "openai", op = "summarize", model = %self.config.gen_model, input_len = text.len()))]
    async fn summarize(&self, text: &str, api_key: &str) -> Result<RemoteAnnotation> {
        let started = Instant::now();
        debug!("Requesting remote annotation");

        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(user_prompt(text)),
            ],
            temperature: Some(self.config.temperature),
            response_format: Some(ResponseFormat::json_object()),
        };

        let response = self
            .build_request("/chat/completions", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (error_type, message) = match serde_json::from_str::<OpenAIErrorResponse>(&body) {
                Ok(parsed) => (parsed.error.error_type, parsed.error.message),
                Err(_) => (String::new(), "Unknown error".to_string()),
            };
            let code = OpenAIErrorCode::from_response(status.as_u16(), &error_type);
            warn!(
                status = status.as_u16(),
                code = ?code,
                "Summarization endpoint returned an error"
            );
            return Err(to_clipper_error(code, status.as_u16(), &message));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::AnnotationParse(format!("Failed to parse response: {}", e)))?;

        let content = result.first_content().unwrap_or_default();
        let annotation = parse_annotation(content)?;

        debug!(
            duration_ms = started.elapsed().as_millis() as u64,
            tags = annotation.tags.len(),
            "Remote annotation received"
        );
        Ok(annotation)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}
