//! JSON bundle import.
//!
//! Accepted shapes:
//! - `{"project": "Name", "clips": [...]}` (one project)
//! - `{"projects": [{"name": "...", "clips": [...]}, ...]}`
//! - `[{"name": "...", "clips": [...]}, ...]`
//!
//! Each bundle entry becomes a fresh project owned by the importing identity.
//! Clip fields are read leniently; anything missing or mistyped falls back to
//! an empty value rather than failing the import.

use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use clipper_core::{
    normalize_tags, AiSource, AiStatus, Clip, Error, Identity, Project, Result,
};

use crate::Store;

/// What an import added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub projects: Vec<Project>,
    pub clips_imported: usize,
}

impl Store {
    /// Import a bundle. New projects are appended; new clips go to the head
    /// of the clip collection in bundle order.
    pub async fn import_bundle(
        &self,
        bundle: &JsonValue,
        identity: Option<&Identity>,
    ) -> Result<ImportSummary> {
        let entries = bundle_entries(bundle)?;
        let now = chrono::Utc::now();

        let mut projects = Vec::with_capacity(entries.len());
        let mut clips = Vec::new();
        for entry in entries {
            let name = entry_name(entry)
                .unwrap_or_else(|| format!("Imported {}", now.format("%Y-%m-%d")));
            let project = Project::new(name, identity);
            if let Some(raw_clips) = entry.get("clips").and_then(JsonValue::as_array) {
                let now_ms = now.timestamp_millis();
                clips.extend(
                    raw_clips
                        .iter()
                        .map(|raw| imported_clip(raw, &project.id, identity, now_ms)),
                );
            }
            projects.push(project);
        }

        self.projects.insert_many(projects.clone()).await?;
        let clips_imported = self.clips.insert_many_head(clips).await?;

        info!(
            subsystem = "store",
            op = "import",
            projects = projects.len(),
            clips_imported,
            "Bundle imported"
        );
        Ok(ImportSummary {
            projects,
            clips_imported,
        })
    }
}

fn bundle_entries(bundle: &JsonValue) -> Result<Vec<&JsonValue>> {
    let projects = bundle.get("projects").and_then(JsonValue::as_array);
    let entries: Vec<&JsonValue> = if let Some(list) = projects {
        list.iter().collect()
    } else if let Some(list) = bundle.as_array() {
        list.iter().collect()
    } else if bundle.get("project").is_some() || bundle.get("clips").is_some() {
        vec![bundle]
    } else {
        Vec::new()
    };

    let entries: Vec<&JsonValue> = entries.into_iter().filter(|e| e.is_object()).collect();
    if entries.is_empty() {
        return Err(Error::InvalidInput(
            "Unsupported import bundle shape".to_string(),
        ));
    }
    Ok(entries)
}

fn entry_name(entry: &JsonValue) -> Option<String> {
    ["name", "project"]
        .iter()
        .filter_map(|k| entry.get(*k).and_then(JsonValue::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_field(raw: &JsonValue, key: &str) -> String {
    match raw.get(key) {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => n.to_string(),
        Some(JsonValue::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn imported_clip(
    raw: &JsonValue,
    project_id: &str,
    identity: Option<&Identity>,
    now_ms: i64,
) -> Clip {
    let tags: Vec<String> = raw
        .get("tags")
        .and_then(JsonValue::as_array)
        .map(|tags| {
            tags.iter()
                .map(|t| match t {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let ai_source = raw
        .get("aiSource")
        .and_then(JsonValue::as_str)
        .and_then(|s| s.parse::<AiSource>().ok())
        .unwrap_or(AiSource::Import);

    Clip {
        id: Uuid::new_v4().to_string(),
        created_at: raw
            .get("createdAt")
            .and_then(JsonValue::as_i64)
            .unwrap_or(now_ms),
        url: string_field(raw, "url"),
        selected_text: string_field(raw, "selectedText"),
        summary: string_field(raw, "summary"),
        notes: string_field(raw, "notes"),
        tags: normalize_tags(&tags),
        project_id: Some(project_id.to_string()),
        ai_status: AiStatus::Done,
        ai_source,
        owner_uid: identity.map(|i| i.uid.clone()).unwrap_or_default(),
        owner_email: identity.map(|i| i.email.clone()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_import_single_project_shape() {
        let store = Store::in_memory();
        let me = Identity::new("u1", "me@example.com");
        store
            .clips
            .insert_head(Clip::pending("https://old", "old", None, Some(&me)))
            .await
            .unwrap();

        let bundle = json!({
            "project": "Reading List",
            "clips": [
                {"id": "keep-me-not", "url": "https://a", "selectedText": "A",
                 "tags": ["Rust", "rust"], "aiSource": "openai", "aiStatus": "pending"},
                {"url": "https://b", "createdAt": 42}
            ]
        });
        let summary = store.import_bundle(&bundle, Some(&me)).await.unwrap();
        assert_eq!(summary.clips_imported, 2);
        assert_eq!(summary.projects.len(), 1);
        let project = &summary.projects[0];
        assert_eq!(project.name, "Reading List");
        assert!(project.id.starts_with("reading-list-"));
        assert!(project.is_owned_by("u1"));

        let clips = store.clips.list().await.unwrap();
        assert_eq!(clips.len(), 3);
        assert_eq!(clips[0].url, "https://a");
        assert_eq!(clips[1].url, "https://b");
        assert_eq!(clips[2].url, "https://old");

        assert_ne!(clips[0].id, "keep-me-not");
        for clip in &clips {
            let id = uuid::Uuid::parse_str(&clip.id).unwrap();
            assert_eq!(id.get_version_num(), 4);
        }
        assert_eq!(clips[0].ai_status, AiStatus::Done);
        assert_eq!(clips[0].ai_source, AiSource::Remote);
        assert_eq!(clips[0].tags, vec!["rust"]);
        assert_eq!(clips[0].project_id.as_deref(), Some(project.id.as_str()));
        assert_eq!(clips[1].ai_source, AiSource::Import);
        assert_eq!(clips[1].created_at, 42);
        assert_eq!(clips[1].owner_email, "me@example.com");
    }

    #[tokio::test]
    async fn test_import_bulk_shapes() {
        let store = Store::in_memory();
        let bundle = json!({
            "projects": [
                {"name": "One", "clips": [{"url": "https://1"}]},
                {"project": "Two", "clips": [{"url": "https://2"}, {"url": "https://3"}]},
                {"clips": []}
            ]
        });
        let summary = store.import_bundle(&bundle, None).await.unwrap();
        assert_eq!(summary.projects.len(), 3);
        assert_eq!(summary.clips_imported, 3);
        assert_eq!(summary.projects[0].name, "One");
        assert_eq!(summary.projects[1].name, "Two");
        assert!(summary.projects[2].name.starts_with("Imported "));

        let bare = json!([{"name": "Three", "clips": [{"url": "https://4"}]}]);
        let summary = store.import_bundle(&bare, None).await.unwrap();
        assert_eq!(summary.clips_imported, 1);
        assert_eq!(store.projects.list().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_import_rejects_unknown_shape() {
        let store = Store::in_memory();
        let err = store.import_bundle(&json!({"foo": 1}), None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = store.import_bundle(&json!([]), None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(store.projects.list().await.unwrap().is_empty());
    }
}
