//! HTTP audit mirror.
//!
//! Posts each freshly captured clip to an external endpoint, authenticated
//! with the signed-in identity's token. Without a token nothing is sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use clipper_core::{defaults, AuditSink, Clip, Error, IdentityProvider, Result};

/// Audit sink posting clips as JSON.
pub struct HttpAuditSink {
    client: Client,
    url: String,
    identity: Arc<dyn IdentityProvider>,
}

impl HttpAuditSink {
    pub fn new(url: impl Into<String>, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        Self::with_timeout(url, identity, Duration::from_secs(defaults::AUDIT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        url: impl Into<String>,
        identity: Arc<dyn IdentityProvider>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build audit HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            identity,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AuditSink for HttpAuditSink {
    #[instrument(skip(self, clip), fields(subsystem = "capture", component = "audit", op = "append", clip_id = %clip.id))]
    async fn append(&self, clip: &Clip) -> Result<()> {
        let token = self
            .identity
            .current_identity()
            .await?
            .and_then(|i| i.id_token)
            .filter(|t| !t.is_empty());
        let Some(token) = token else {
            debug!("No identity token, audit mirror skipped");
            return Ok(());
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(clip)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Audit(format!(
                "Audit mirror returned {}: {}",
                status.as_u16(),
                body
            )));
        }
        debug!(status = status.as_u16(), "Clip mirrored");
        Ok(())
    }
}
