//! Project repository.

use tracing::{info, warn};

use clipper_core::{defaults, Clip, Error, Identity, Project, Result};

use crate::mutator::StoreMutator;

/// Result of deleting a project together with its clips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDeletion {
    pub project: Project,
    pub clips_removed: usize,
}

/// Repository for project operations over the shared projects collection.
#[derive(Clone)]
pub struct ProjectRepository {
    mutator: StoreMutator,
}

impl ProjectRepository {
    pub fn new(mutator: StoreMutator) -> Self {
        Self { mutator }
    }

    pub async fn list(&self) -> Result<Vec<Project>> {
        self.mutator.read_all(defaults::PROJECTS_KEY).await
    }

    /// Projects owned by `uid`, deduplicated by id (first occurrence wins).
    pub async fn list_for_owner(&self, uid: &str) -> Result<Vec<Project>> {
        let mut owned: Vec<Project> = Vec::new();
        for project in self.list().await? {
            if !project.is_owned_by(uid) || project.id.is_empty() {
                continue;
            }
            if !owned.iter().any(|p| p.id == project.id) {
                owned.push(project);
            }
        }
        Ok(owned)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Project>> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    /// Create a project owned by `identity` and append it to the collection.
    pub async fn create(&self, name: &str, identity: Option<&Identity>) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Project name cannot be empty".to_string()));
        }
        let project = Project::new(name, identity);
        self.insert(project.clone()).await?;
        info!(subsystem = "store", project_id = %project.id, "Project created");
        Ok(project)
    }

    /// Append already-built projects.
    pub async fn insert_many(&self, projects: Vec<Project>) -> Result<()> {
        if projects.is_empty() {
            return Ok(());
        }
        self.mutator
            .mutate(defaults::PROJECTS_KEY, move |all: &mut Vec<Project>| {
                all.extend(projects.iter().cloned());
            })
            .await
    }

    pub async fn insert(&self, project: Project) -> Result<()> {
        self.insert_many(vec![project]).await
    }

    /// Delete a project and every clip referencing it.
    ///
    /// The project is removed first. If the clip sweep then fails, the
    /// leftover clips hold a dangling reference, which readers treat as
    /// unassigned.
    pub async fn delete_cascade(&self, id: &str) -> Result<ProjectDeletion> {
        let removed = self
            .mutator
            .mutate(defaults::PROJECTS_KEY, |all: &mut Vec<Project>| {
                let found = all.iter().find(|p| p.id == id).cloned();
                all.retain(|p| p.id != id);
                found
            })
            .await?;
        let project = removed.ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;

        let clips_removed = self
            .mutator
            .mutate(defaults::CLIPS_KEY, |clips: &mut Vec<Clip>| {
                let before = clips.len();
                clips.retain(|c| c.project_id.as_deref() != Some(id));
                before - clips.len()
            })
            .await
            .map_err(|e| {
                warn!(project_id = id, error = %e, "Project removed but clip sweep failed");
                e
            })?;

        info!(
            subsystem = "store",
            project_id = id,
            clips_removed,
            "Project deleted with cascade"
        );
        Ok(ProjectDeletion {
            project,
            clips_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clips::ClipRepository;
    use crate::memory::MemoryBackend;
    use std::sync::Arc;

    fn repos() -> (ProjectRepository, ClipRepository) {
        let mutator = StoreMutator::new(Arc::new(MemoryBackend::new()));
        (
            ProjectRepository::new(mutator.clone()),
            ClipRepository::new(mutator),
        )
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (projects, _) = repos();
        let err = projects.create("   ", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_list_for_owner_dedups() {
        let (projects, _) = repos();
        let me = Identity::new("u1", "");
        let p = projects.create("Alpha", Some(&me)).await.unwrap();
        projects.insert(p.clone()).await.unwrap();
        projects.create("Beta", Some(&Identity::new("u2", ""))).await.unwrap();

        let mine = projects.list_for_owner("u1").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, p.id);
        assert_eq!(projects.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_cascade_removes_only_referencing_clips() {
        let (projects, clips) = repos();
        let me = Identity::new("u1", "");
        let p = projects.create("Doomed", Some(&me)).await.unwrap();
        let keep = projects.create("Kept", Some(&me)).await.unwrap();

        clips
            .insert_head(Clip::pending("https://a", "a", Some(p.id.clone()), Some(&me)))
            .await
            .unwrap();
        clips
            .insert_head(Clip::pending("https://b", "b", Some(keep.id.clone()), Some(&me)))
            .await
            .unwrap();
        clips
            .insert_head(Clip::pending("https://c", "c", None, Some(&me)))
            .await
            .unwrap();

        let deletion = projects.delete_cascade(&p.id).await.unwrap();
        assert_eq!(deletion.clips_removed, 1);
        assert_eq!(deletion.project.id, p.id);

        let left = projects.list().await.unwrap();
        assert_eq!(left, vec![keep.clone()]);
        let remaining = clips.list().await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|c| c.project_id.as_deref() != Some(p.id.as_str())));
    }

    #[tokio::test]
    async fn test_delete_missing_project() {
        let (projects, _) = repos();
        let err = projects.delete_cascade("ghost").await.unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }
}
