//! Clip repository.
//!
//! Every write goes through [`StoreMutator::mutate`] on the clips key, so
//! concurrent captures, annotation write-backs and user edits never lose one
//! another's updates. The collection is kept newest-first.

use tracing::{debug, info};

use clipper_core::{defaults, Annotation, Clip, Error, Result};

use crate::mutator::StoreMutator;

/// Repository for clip operations over the shared clips collection.
#[derive(Clone)]
pub struct ClipRepository {
    mutator: StoreMutator,
}

/// Editable free-text fields of a clip.
#[derive(Debug, Clone, Default)]
pub struct ClipEdit {
    pub summary: Option<String>,
    pub notes: Option<String>,
}

impl ClipRepository {
    pub fn new(mutator: StoreMutator) -> Self {
        Self { mutator }
    }

    /// All clips, newest first.
    pub async fn list(&self) -> Result<Vec<Clip>> {
        self.mutator.read_all(defaults::CLIPS_KEY).await
    }

    /// Clips owned by `uid`.
    pub async fn list_for_owner(&self, uid: &str) -> Result<Vec<Clip>> {
        let clips = self.list().await?;
        Ok(clips.into_iter().filter(|c| c.owner_uid == uid).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Clip>> {
        let clips = self.list().await?;
        Ok(clips.into_iter().find(|c| c.id == id))
    }

    /// Insert at the head of the collection.
    pub async fn insert_head(&self, clip: Clip) -> Result<()> {
        let id = clip.id.clone();
        self.mutator
            .mutate(defaults::CLIPS_KEY, move |clips: &mut Vec<Clip>| {
                clips.insert(0, clip.clone());
            })
            .await?;
        debug!(subsystem = "store", clip_id = %id, "Clip inserted");
        Ok(())
    }

    /// Insert several clips at the head, keeping their relative order.
    pub async fn insert_many_head(&self, new_clips: Vec<Clip>) -> Result<usize> {
        let count = new_clips.len();
        if count == 0 {
            return Ok(0);
        }
        self.mutator
            .mutate(defaults::CLIPS_KEY, move |clips: &mut Vec<Clip>| {
                clips.splice(0..0, new_clips.iter().cloned());
            })
            .await?;
        Ok(count)
    }

    /// Write the resolver result onto a pending clip and mark it done.
    ///
    /// Returns false when the clip no longer exists or was already annotated.
    pub async fn apply_annotation(&self, id: &str, annotation: &Annotation) -> Result<bool> {
        let applied = self
            .mutator
            .mutate(defaults::CLIPS_KEY, |clips: &mut Vec<Clip>| {
                clips
                    .iter_mut()
                    .find(|c| c.id == id)
                    .map(|c| c.apply_annotation(annotation))
                    .unwrap_or(false)
            })
            .await?;
        debug!(clip_id = id, applied, ai_source = %annotation.source, "Annotation write-back");
        Ok(applied)
    }

    /// Edit summary and/or notes.
    pub async fn edit(&self, id: &str, edit: ClipEdit) -> Result<Clip> {
        self.update_one(id, |clip| {
            if let Some(summary) = &edit.summary {
                clip.summary = summary.clone();
            }
            if let Some(notes) = &edit.notes {
                clip.notes = notes.clone();
            }
        })
        .await
    }

    /// Reassign a clip to a project, or unassign with `None`.
    pub async fn move_to_project(&self, id: &str, project_id: Option<&str>) -> Result<Clip> {
        let target = project_id.filter(|p| !p.is_empty()).map(str::to_string);
        self.update_one(id, |clip| clip.project_id = target.clone())
            .await
    }

    /// Add a normalized tag. Returns false when blank or already present.
    pub async fn add_tag(&self, id: &str, tag: &str) -> Result<bool> {
        let mut added = false;
        self.update_one(id, |clip| added = clip.add_tag(tag)).await?;
        Ok(added)
    }

    /// Remove a tag. Returns false when it was not present.
    pub async fn remove_tag(&self, id: &str, tag: &str) -> Result<bool> {
        let mut removed = false;
        self.update_one(id, |clip| removed = clip.remove_tag(tag))
            .await?;
        Ok(removed)
    }

    /// Delete one clip. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let removed = self.delete_many(&[id.to_string()]).await?;
        Ok(removed == 1)
    }

    /// Delete every clip whose id is in `ids`. Returns the number removed.
    pub async fn delete_many(&self, ids: &[String]) -> Result<usize> {
        let removed = self
            .mutator
            .mutate(defaults::CLIPS_KEY, |clips: &mut Vec<Clip>| {
                let before = clips.len();
                clips.retain(|c| !ids.contains(&c.id));
                before - clips.len()
            })
            .await?;
        info!(subsystem = "store", removed, "Clips deleted");
        Ok(removed)
    }

    /// Reassign every clip in `ids`. Returns the number moved.
    pub async fn move_many(&self, ids: &[String], project_id: Option<&str>) -> Result<usize> {
        let target = project_id.filter(|p| !p.is_empty()).map(str::to_string);
        self.mutator
            .mutate(defaults::CLIPS_KEY, |clips: &mut Vec<Clip>| {
                let mut moved = 0;
                for clip in clips.iter_mut().filter(|c| ids.contains(&c.id)) {
                    clip.project_id = target.clone();
                    moved += 1;
                }
                moved
            })
            .await
    }

    /// Delete every clip referencing `project_id`. Returns the number removed.
    pub async fn delete_by_project(&self, project_id: &str) -> Result<usize> {
        self.mutator
            .mutate(defaults::CLIPS_KEY, |clips: &mut Vec<Clip>| {
                let before = clips.len();
                clips.retain(|c| c.project_id.as_deref() != Some(project_id));
                before - clips.len()
            })
            .await
    }

    /// Move clip `id` to the position currently held by `target_id`.
    ///
    /// Returns false when either clip is missing.
    pub async fn reorder(&self, id: &str, target_id: &str) -> Result<bool> {
        self.mutator
            .mutate(defaults::CLIPS_KEY, |clips: &mut Vec<Clip>| {
                let from = clips.iter().position(|c| c.id == id);
                let to = clips.iter().position(|c| c.id == target_id);
                match (from, to) {
                    (Some(from), Some(to)) => {
                        let clip = clips.remove(from);
                        clips.insert(to, clip);
                        true
                    }
                    _ => false,
                }
            })
            .await
    }

    async fn update_one<F>(&self, id: &str, mut f: F) -> Result<Clip>
    where
        F: FnMut(&mut Clip) + Send,
    {
        let updated = self
            .mutator
            .mutate(defaults::CLIPS_KEY, |clips: &mut Vec<Clip>| {
                clips.iter_mut().find(|c| c.id == id).map(|clip| {
                    f(clip);
                    clip.clone()
                })
            })
            .await?;
        updated.ok_or_else(|| Error::ClipNotFound(id.to_string()))
    }
}
