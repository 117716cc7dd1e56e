//! Core data models: clips, projects, identities, annotations and the
//! trigger-surface entries built from them.
//!
//! Clips and projects are persisted as whole JSON collections, so the wire
//! format (camelCase field names, string enums) is part of the contract.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::tags::{deserialize_tags, normalize_tag, normalize_tags};

// =============================================================================
// ENUMS
// =============================================================================

/// Annotation lifecycle of a clip. Moves `Pending` → `Done` once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AiStatus {
    #[default]
    Pending,
    Done,
}

impl std::fmt::Display for AiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Which path produced a clip's summary and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AiSource {
    /// Not annotated yet (pending clips).
    #[default]
    Manual,
    /// Heuristic result standing in for an unavailable remote tier.
    Mock,
    /// Heuristic result when the mock tier is switched off.
    Fallback,
    /// Remote summarization endpoint.
    #[serde(alias = "openai")]
    Remote,
    /// Annotation disabled by configuration; heuristic used.
    Disabled,
    /// Input normalized to nothing.
    Empty,
    /// The resolver itself failed.
    Error,
    /// Clip came from an import bundle.
    Import,
}

impl std::fmt::Display for AiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Manual => "manual",
            Self::Mock => "mock",
            Self::Fallback => "fallback",
            Self::Remote => "remote",
            Self::Disabled => "disabled",
            Self::Empty => "empty",
            Self::Error => "error",
            Self::Import => "import",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AiSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "mock" => Ok(Self::Mock),
            "fallback" => Ok(Self::Fallback),
            "remote" | "openai" => Ok(Self::Remote),
            "disabled" => Ok(Self::Disabled),
            "empty" => Ok(Self::Empty),
            "error" => Ok(Self::Error),
            "import" => Ok(Self::Import),
            _ => Err(format!("Invalid AI source: {}", s)),
        }
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// The signed-in user, as stored under the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub uid: String,
    /// Sign-in providers may report no email; stored as `null`.
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub email: String,
    /// Bearer token for the audit mirror, when the sign-in flow provided one.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_id"
    )]
    pub id_token: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            id_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }
}

// =============================================================================
// CLIP
// =============================================================================

/// A persisted record of captured text plus its annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub ai_status: AiStatus,
    #[serde(default)]
    pub ai_source: AiSource,
    #[serde(default)]
    pub owner_uid: String,
    #[serde(default)]
    pub owner_email: String,
}

impl Clip {
    /// Build a pending clip owned by `identity` (empty owner fields if none).
    pub fn pending(
        url: impl Into<String>,
        selected_text: impl Into<String>,
        project_id: Option<String>,
        identity: Option<&Identity>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
            url: url.into(),
            selected_text: selected_text.into(),
            summary: String::new(),
            notes: String::new(),
            tags: Vec::new(),
            project_id: project_id.filter(|p| !p.is_empty()),
            ai_status: AiStatus::Pending,
            ai_source: AiSource::Manual,
            owner_uid: identity.map(|i| i.uid.clone()).unwrap_or_default(),
            owner_email: identity.map(|i| i.email.clone()).unwrap_or_default(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.ai_status == AiStatus::Pending
    }

    /// Write the resolver result back and mark the clip done.
    ///
    /// Only a pending clip accepts an annotation; returns whether it applied.
    pub fn apply_annotation(&mut self, annotation: &Annotation) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.summary = annotation.summary.clone();
        self.tags = normalize_tags(&annotation.tags);
        self.ai_source = annotation.source;
        self.ai_status = AiStatus::Done;
        true
    }

    /// Add a tag after normalization. Returns false for blank or duplicate.
    pub fn add_tag(&mut self, raw: &str) -> bool {
        match normalize_tag(raw) {
            Some(tag) if !self.tags.contains(&tag) => {
                self.tags.push(tag);
                true
            }
            _ => false,
        }
    }

    /// Remove a tag. Returns whether it was present.
    pub fn remove_tag(&mut self, raw: &str) -> bool {
        let Some(tag) = normalize_tag(raw) else {
            return false;
        };
        let before = self.tags.len();
        self.tags.retain(|t| *t != tag);
        self.tags.len() != before
    }

    /// The project this clip belongs to, or `None` when unassigned or the
    /// referenced project no longer exists.
    pub fn effective_project<'a>(&self, projects: &'a [Project]) -> Option<&'a Project> {
        let pid = self.project_id.as_deref()?;
        projects.iter().find(|p| p.id == pid)
    }
}

/// Treat `null`, missing and `""` project references as unassigned.
/// `null` reads as an empty string.
fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

// =============================================================================
// PROJECT
// =============================================================================

/// A named grouping owning zero or more clips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_uid: String,
    #[serde(default)]
    pub owner_email: String,
}

impl Project {
    /// New project with a slug id derived from `name` plus a random suffix.
    pub fn new(name: impl Into<String>, identity: Option<&Identity>) -> Self {
        let name = name.into();
        Self {
            id: project_slug(&name),
            name,
            owner_uid: identity.map(|i| i.uid.clone()).unwrap_or_default(),
            owner_email: identity.map(|i| i.email.clone()).unwrap_or_default(),
        }
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_uid == uid
    }
}

const SLUG_SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SLUG_SUFFIX_LEN: usize = 4;

/// `"My Reading List"` → `"my-reading-list-x7q2"`.
pub fn project_slug(name: &str) -> String {
    let base = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SLUG_SUFFIX_LEN)
        .map(|_| SLUG_SUFFIX_ALPHABET[rng.gen_range(0..SLUG_SUFFIX_ALPHABET.len())] as char)
        .collect();
    if base.is_empty() {
        suffix
    } else {
        format!("{}-{}", base, suffix)
    }
}

// =============================================================================
// ANNOTATION
// =============================================================================

/// Resolver output written back onto a clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub summary: String,
    pub tags: Vec<String>,
    pub source: AiSource,
}

impl Annotation {
    pub fn new(summary: impl Into<String>, tags: Vec<String>, source: AiSource) -> Self {
        Self {
            summary: summary.into(),
            tags,
            source,
        }
    }

    /// Result for input that normalizes to nothing.
    pub fn empty() -> Self {
        Self::new("", Vec::new(), AiSource::Empty)
    }

    /// Substitute used when the resolver itself fails.
    pub fn error() -> Self {
        Self::new("", Vec::new(), AiSource::Error)
    }
}

/// Summary and tags as returned by a remote summarization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteAnnotation {
    pub summary: String,
    pub tags: Vec<String>,
}

/// Runtime annotation settings, read from the store on every capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationConfig {
    pub ai_disabled: bool,
    pub use_mock_if_fail: bool,
    pub api_key: Option<String>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            ai_disabled: false,
            use_mock_if_fail: true,
            api_key: None,
        }
    }
}

impl AnnotationConfig {
    /// The API key, if present and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

// =============================================================================
// CAPTURE TARGET
// =============================================================================

/// The browsing context a capture reads its selection from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureTarget {
    pub tab_id: i64,
    pub url: String,
}

impl CaptureTarget {
    pub fn new(tab_id: i64, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            url: url.into(),
        }
    }
}

// =============================================================================
// TRIGGER SURFACE
// =============================================================================

/// Kind of trigger-surface entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MenuEntryKind {
    #[default]
    Normal,
    Separator,
}

/// One entry on the external trigger surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub kind: MenuEntryKind,
}

impl MenuEntry {
    pub fn root(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            title: title.into(),
            kind: MenuEntryKind::Normal,
        }
    }

    pub fn child(id: impl Into<String>, parent: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: Some(parent.into()),
            title: title.into(),
            kind: MenuEntryKind::Normal,
        }
    }

    pub fn separator(id: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: Some(parent.into()),
            title: String::new(),
            kind: MenuEntryKind::Separator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_clip() -> Clip {
        let me = Identity::new("u1", "u1@example.com");
        Clip::pending("https://example.com", "Some text", Some("p1".into()), Some(&me))
    }

    #[test]
    fn test_identity_tolerates_null_fields() {
        let identity: Identity =
            serde_json::from_str(r#"{"uid":"u1","email":null,"idToken":null}"#).unwrap();
        assert_eq!(identity, Identity::new("u1", ""));

        let identity: Identity = serde_json::from_str(r#"{"uid":"u1","idToken":" "}"#).unwrap();
        assert!(identity.id_token.is_none());

        let identity: Identity = serde_json::from_str(r#"{"uid":null}"#).unwrap();
        assert!(identity.uid.is_empty());
    }

    #[test]
    fn test_clip_ids_are_random_uuids() {
        let clip = sample_clip();
        let id = Uuid::parse_str(&clip.id).unwrap();
        assert_eq!(id.get_version_num(), 4);
        assert_ne!(clip.id, sample_clip().id);
    }

    #[test]
    fn test_pending_clip_owner_fields() {
        let clip = sample_clip();
        assert_eq!(clip.owner_uid, "u1");
        assert_eq!(clip.owner_email, "u1@example.com");
        assert_eq!(clip.ai_status, AiStatus::Pending);
        assert_eq!(clip.ai_source, AiSource::Manual);
        assert!(clip.tags.is_empty());
    }

    #[test]
    fn test_pending_clip_without_identity() {
        let clip = Clip::pending("https://example.com", "x", None, None);
        assert!(clip.owner_uid.is_empty());
        assert!(clip.owner_email.is_empty());
        assert!(clip.project_id.is_none());
    }

    #[test]
    fn test_pending_clip_blank_project_is_unassigned() {
        let clip = Clip::pending("https://example.com", "x", Some(String::new()), None);
        assert!(clip.project_id.is_none());
    }

    #[test]
    fn test_apply_annotation_once() {
        let mut clip = sample_clip();
        let first = Annotation::new("Sum", vec!["Rust".into(), "rust".into()], AiSource::Remote);
        assert!(clip.apply_annotation(&first));
        assert_eq!(clip.ai_status, AiStatus::Done);
        assert_eq!(clip.tags, vec!["rust"]);

        let second = Annotation::new("Other", vec![], AiSource::Mock);
        assert!(!clip.apply_annotation(&second));
        assert_eq!(clip.summary, "Sum");
        assert_eq!(clip.ai_source, AiSource::Remote);
    }

    #[test]
    fn test_add_and_remove_tag() {
        let mut clip = sample_clip();
        assert!(clip.add_tag(" Async "));
        assert!(!clip.add_tag("async"));
        assert!(!clip.add_tag("  "));
        assert_eq!(clip.tags, vec!["async"]);
        assert!(clip.remove_tag("ASYNC"));
        assert!(!clip.remove_tag("async"));
        assert!(clip.tags.is_empty());
    }

    #[test]
    fn test_clip_round_trip_json() {
        let mut clip = sample_clip();
        clip.apply_annotation(&Annotation::new("S", vec!["a".into()], AiSource::Mock));
        let json = serde_json::to_value(&clip).unwrap();
        assert_eq!(json["selectedText"], "Some text");
        assert_eq!(json["aiStatus"], "done");
        assert_eq!(json["aiSource"], "mock");
        let back: Clip = serde_json::from_value(json).unwrap();
        assert_eq!(back, clip);
    }

    #[test]
    fn test_clip_reads_legacy_shape() {
        let json = serde_json::json!({
            "id": "c1",
            "createdAt": 1700000000000i64,
            "url": "https://example.com",
            "selectedText": "hello",
            "summary": "",
            "tags": ["Web", "web", " notes "],
            "projectId": "",
            "aiStatus": "done",
            "aiSource": "openai",
            "ownerUid": "u1",
            "ownerEmail": ""
        });
        let clip: Clip = serde_json::from_value(json).unwrap();
        assert!(clip.project_id.is_none());
        assert_eq!(clip.ai_source, AiSource::Remote);
        assert_eq!(clip.tags, vec!["web", "notes"]);
        assert!(clip.notes.is_empty());
    }

    #[test]
    fn test_effective_project_dangling_is_unassigned() {
        let clip = sample_clip();
        let projects = vec![Project {
            id: "other".into(),
            name: "Other".into(),
            owner_uid: "u1".into(),
            owner_email: String::new(),
        }];
        assert!(clip.effective_project(&projects).is_none());

        let projects = vec![Project {
            id: "p1".into(),
            name: "P1".into(),
            owner_uid: "u1".into(),
            owner_email: String::new(),
        }];
        assert_eq!(clip.effective_project(&projects).unwrap().name, "P1");
    }

    #[test]
    fn test_project_slug_shape() {
        let slug = project_slug("My  Reading List");
        assert!(slug.starts_with("my-reading-list-"));
        assert_eq!(slug.len(), "my-reading-list-".len() + 4);

        let bare = project_slug("   ");
        assert_eq!(bare.len(), 4);
    }

    #[test]
    fn test_project_new_owner() {
        let me = Identity::new("u9", "u9@example.com");
        let p = Project::new("Research", Some(&me));
        assert!(p.is_owned_by("u9"));
        assert_eq!(p.owner_email, "u9@example.com");
        assert!(p.id.starts_with("research-"));
    }

    #[test]
    fn test_ai_source_from_str() {
        assert_eq!("openai".parse::<AiSource>().unwrap(), AiSource::Remote);
        assert_eq!("Mock".parse::<AiSource>().unwrap(), AiSource::Mock);
        assert!("bogus".parse::<AiSource>().is_err());
        assert_eq!(AiSource::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_annotation_config_blank_key() {
        let cfg = AnnotationConfig {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(cfg.api_key().is_none());
        assert!(cfg.use_mock_if_fail);
    }

    #[test]
    fn test_identity_token_serialization() {
        let me = Identity::new("u1", "a@b.c").with_token("tok");
        let json = serde_json::to_value(&me).unwrap();
        assert_eq!(json["idToken"], "tok");
        let anon = Identity::new("u2", "");
        let json = serde_json::to_value(&anon).unwrap();
        assert!(json.get("idToken").is_none());
    }
}
