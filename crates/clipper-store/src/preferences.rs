//! Scalar settings: identity, per-identity default project, annotation
//! settings.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use clipper_core::{defaults, AnnotationConfig, Identity, IdentityProvider, Result};

use crate::mutator::StoreMutator;

/// Storage key of the default-project preference for `uid` (anonymous when
/// `None` or blank).
pub fn default_project_key(uid: Option<&str>) -> String {
    let segment = uid
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(defaults::ANONYMOUS_UID);
    format!("{}{}", defaults::DEFAULT_PROJECT_KEY_PREFIX, segment)
}

/// Typed access to scalar preference keys.
#[derive(Clone)]
pub struct Preferences {
    mutator: StoreMutator,
}

impl Preferences {
    pub fn new(mutator: StoreMutator) -> Self {
        Self { mutator }
    }

    /// The signed-in identity, if any.
    pub async fn identity(&self) -> Result<Option<Identity>> {
        let identity: Option<Identity> = self.mutator.read_value(defaults::IDENTITY_KEY).await?;
        Ok(identity.filter(|i| !i.uid.is_empty()))
    }

    /// Store (or clear with `None`) the signed-in identity.
    pub async fn set_identity(&self, identity: Option<&Identity>) -> Result<()> {
        match identity {
            Some(identity) => self.mutator.write_value(defaults::IDENTITY_KEY, identity).await,
            None => {
                self.mutator
                    .write_value(defaults::IDENTITY_KEY, &JsonValue::Null)
                    .await
            }
        }
    }

    /// The raw default-project id stored for `identity`. Not validated
    /// against the project list.
    pub async fn default_project_id(&self, identity: Option<&Identity>) -> Result<Option<String>> {
        let key = default_project_key(identity.map(|i| i.uid.as_str()));
        let id: Option<String> = self.mutator.read_value(&key).await?;
        Ok(id.filter(|id| !id.is_empty()))
    }

    /// Set (or clear with `None`) the default project for `identity`.
    pub async fn set_default_project(
        &self,
        identity: Option<&Identity>,
        project_id: Option<&str>,
    ) -> Result<()> {
        let key = default_project_key(identity.map(|i| i.uid.as_str()));
        debug!(key = %key, project_id = ?project_id, "Default project updated");
        self.mutator
            .write_value(&key, &project_id.unwrap_or_default())
            .await
    }

    /// Annotation settings with defaults for missing keys.
    pub async fn annotation_config(&self) -> Result<AnnotationConfig> {
        let fallback = AnnotationConfig::default();
        let api_key: Option<String> = self.mutator.read_value(defaults::API_KEY_KEY).await?;
        let use_mock_if_fail: Option<bool> =
            self.mutator.read_value(defaults::USE_MOCK_IF_FAIL_KEY).await?;
        let ai_disabled: Option<bool> = self.mutator.read_value(defaults::AI_DISABLED_KEY).await?;

        Ok(AnnotationConfig {
            ai_disabled: ai_disabled.unwrap_or(fallback.ai_disabled),
            use_mock_if_fail: use_mock_if_fail.unwrap_or(fallback.use_mock_if_fail),
            api_key: api_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        })
    }

    /// Persist annotation settings in one write.
    pub async fn save_annotation_config(&self, config: &AnnotationConfig) -> Result<()> {
        self.mutator
            .write_values(vec![
                (
                    defaults::API_KEY_KEY.to_string(),
                    JsonValue::String(config.api_key().unwrap_or_default().to_string()),
                ),
                (
                    defaults::USE_MOCK_IF_FAIL_KEY.to_string(),
                    JsonValue::Bool(config.use_mock_if_fail),
                ),
                (
                    defaults::AI_DISABLED_KEY.to_string(),
                    JsonValue::Bool(config.ai_disabled),
                ),
            ])
            .await
    }
}

/// [`IdentityProvider`] reading the identity persisted by the sign-in flow.
#[derive(Clone)]
pub struct StoredIdentityProvider {
    preferences: Preferences,
}

impl StoredIdentityProvider {
    pub fn new(preferences: Preferences) -> Self {
        Self { preferences }
    }
}

#[async_trait]
impl IdentityProvider for StoredIdentityProvider {
    async fn current_identity(&self) -> Result<Option<Identity>> {
        self.preferences.identity().await
    }
}
