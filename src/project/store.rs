// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Project store with save-on-mutation persistence

use chrono::Utc;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{PhotoRecord, PhotoStatus, Project};
use crate::analysis::MAX_RATING;
use crate::{CullError, Result};

/// Called with the whole project after every mutation
pub trait SaveHook: Send {
    fn save(&mut self, project: &Project) -> Result<()>;

    /// Where the project lives on disk, if anywhere
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// Writes the project as pretty JSON, via a temp file and rename
pub struct JsonFileHook {
    path: PathBuf,
}

impl JsonFileHook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Project> {
        let content = fs::read_to_string(&self.path)?;
        let project = serde_json::from_str(&content)
            .map_err(|e| CullError::Config(format!("Failed to parse project {}: {}", self.path.display(), e)))?;
        Ok(project)
    }
}

impl SaveHook for JsonFileHook {
    fn save(&mut self, project: &Project) -> Result<()> {
        let json = serde_json::to_string_pretty(project)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved project to {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Keeps nothing, counts saves
#[derive(Default, Clone)]
pub struct MemoryHook {
    saves: Arc<AtomicUsize>,
}

impl MemoryHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SaveHook for MemoryHook {
    fn save(&mut self, _project: &Project) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Owns the project; every change goes through `update`
pub struct ProjectStore {
    project: Project,
    hook: Box<dyn SaveHook>,
}

impl ProjectStore {
    pub fn with_hook(project: Project, hook: Box<dyn SaveHook>) -> Self {
        Self { project, hook }
    }

    /// Start a new project file; refuses to overwrite unless `force`
    pub fn create(path: &Path, name: &str, force: bool) -> Result<Self> {
        if path.exists() && !force {
            return Err(CullError::Config(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }
        let mut store = Self::with_hook(Project::new(name), Box::new(JsonFileHook::new(path)));
        store.save()?;
        info!("Created project '{}' at {}", name, path.display());
        Ok(store)
    }

    /// Open an existing project file
    ///
    /// Photos left `processing` by an interrupted run go back to `pending`.
    pub fn open(path: &Path) -> Result<Self> {
        let hook = JsonFileHook::new(path);
        let mut project = hook.load()?;

        for photo in project.photos.iter_mut().filter(|p| p.status == PhotoStatus::Processing) {
            warn!("{}: interrupted while processing, back to pending", photo.file_name);
            photo.status = PhotoStatus::Pending;
        }

        Ok(Self::with_hook(project, Box::new(hook)))
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn location(&self) -> Option<&Path> {
        self.hook.location()
    }

    /// Directory for cached previews: `<project>.previews` beside the project file
    pub fn preview_dir(&self) -> Option<PathBuf> {
        self.location().map(|p| p.with_extension("previews"))
    }

    pub fn save(&mut self) -> Result<()> {
        self.hook.save(&self.project)
    }

    /// Apply a mutation, stamp the modification time and persist
    ///
    /// Nothing is saved when `f` fails.
    pub fn update<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Project) -> Result<T>,
    {
        let value = f(&mut self.project)?;
        self.project.modified_at = Utc::now();
        self.hook.save(&self.project)?;
        Ok(value)
    }

    /// Mutate one photo by id
    pub fn update_photo<T, F>(&mut self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut PhotoRecord) -> T,
    {
        self.update(|project| {
            project
                .photo_mut(id)
                .map(f)
                .ok_or_else(|| CullError::PhotoNotFound(id.to_string()))
        })
    }

    /// Full id for an id or unambiguous prefix
    pub fn resolve(&self, query: &str) -> Result<String> {
        self.project
            .resolve_id(query)
            .ok_or_else(|| CullError::PhotoNotFound(query.to_string()))
    }

    /// Add photos, skipping paths already in the project; returns the new ids
    pub fn add_paths(&mut self, paths: Vec<PathBuf>) -> Result<Vec<String>> {
        self.update(|project| {
            let mut known: HashSet<PathBuf> = project.photos.iter().map(|p| p.path.clone()).collect();
            let mut added = Vec::new();

            for path in paths {
                let path = fs::canonicalize(&path).unwrap_or(path);
                if !known.insert(path.clone()) {
                    debug!("Already in project: {}", path.display());
                    continue;
                }
                let record = PhotoRecord::new(path);
                added.push(record.id.clone());
                project.photos.push(record);
            }

            Ok(added)
        })
    }

    pub fn remove(&mut self, query: &str) -> Result<PhotoRecord> {
        let id = self.resolve(query)?;
        let removed = self.update(|project| {
            let index = project
                .photos
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| CullError::PhotoNotFound(id.clone()))?;
            Ok(project.photos.remove(index))
        })?;
        discard_preview(&removed);
        Ok(removed)
    }

    /// Drop every photo; returns how many were removed
    pub fn clear(&mut self) -> Result<usize> {
        let removed = self.update(|project| Ok(std::mem::take(&mut project.photos)))?;
        removed.iter().for_each(discard_preview);
        if let Some(dir) = self.preview_dir() {
            // Fails harmlessly while other files remain
            let _ = fs::remove_dir(dir);
        }
        Ok(removed.len())
    }

    /// Set or clear the manual rating
    pub fn set_rating_override(&mut self, query: &str, rating: Option<u8>) -> Result<()> {
        if let Some(r) = rating {
            if r > MAX_RATING {
                return Err(CullError::InvalidRating(r as i64));
            }
        }
        let id = self.resolve(query)?;
        self.update_photo(&id, |photo| photo.rating_override = rating)
    }

    /// Failed photos cannot be selected
    pub fn set_selected(&mut self, query: &str, selected: bool) -> Result<()> {
        let id = self.resolve(query)?;
        self.update(|project| {
            let photo = project
                .photo_mut(&id)
                .ok_or_else(|| CullError::PhotoNotFound(id.clone()))?;
            if selected && photo.status == PhotoStatus::Failed {
                return Err(CullError::Config(format!(
                    "{} failed; retry it before selecting",
                    photo.file_name
                )));
            }
            photo.selected = selected;
            Ok(())
        })
    }

    /// Move failed photos back to pending; returns how many
    pub fn reset_failed(&mut self) -> Result<usize> {
        self.update(|project| {
            let mut count = 0;
            for photo in project.photos.iter_mut().filter(|p| p.status == PhotoStatus::Failed) {
                photo.reset();
                count += 1;
            }
            Ok(count)
        })
    }

    /// Ids of pending photos in project order
    pub fn pending_ids(&self) -> Vec<String> {
        self.project
            .photos
            .iter()
            .filter(|p| p.status == PhotoStatus::Pending)
            .map(|p| p.id.clone())
            .collect()
    }
}

/// Delete the cached preview of a photo that left the project
fn discard_preview(photo: &PhotoRecord) {
    let Some(preview) = &photo.preview else {
        return;
    };
    match fs::remove_file(&preview.path) {
        Ok(()) => debug!("Removed cached preview {}", preview.path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", preview.path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisOutcome, AnalysisResult};
    use crate::project::PreviewRef;

    fn memory_store() -> (ProjectStore, MemoryHook) {
        let hook = MemoryHook::new();
        (ProjectStore::with_hook(Project::new("test"), Box::new(hook.clone())), hook)
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/nonexistent/{}", n))).collect()
    }

    #[test]
    fn test_every_mutation_saves() {
        let (mut store, hook) = memory_store();
        let ids = store.add_paths(paths(&["a.jpg", "b.jpg"])).unwrap();
        assert_eq!(hook.saves(), 1);

        store.set_rating_override(&ids[0], Some(4)).unwrap();
        store.set_selected(&ids[1], true).unwrap();
        store.remove(&ids[1]).unwrap();
        assert_eq!(hook.saves(), 4);
    }

    #[test]
    fn test_failed_mutation_does_not_save() {
        let (mut store, hook) = memory_store();
        assert!(matches!(store.set_selected("missing", true), Err(CullError::PhotoNotFound(_))));
        assert!(matches!(store.set_rating_override("x", Some(6)), Err(CullError::InvalidRating(6))));
        assert_eq!(hook.saves(), 0);
    }

    #[test]
    fn test_add_deduplicates() {
        let (mut store, _) = memory_store();
        store.add_paths(paths(&["a.jpg", "b.jpg"])).unwrap();
        let added = store.add_paths(paths(&["b.jpg", "c.jpg", "c.jpg"])).unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(store.project().photos.len(), 3);
    }

    #[test]
    fn test_failed_photo_cannot_be_selected() {
        let (mut store, _) = memory_store();
        let ids = store.add_paths(paths(&["a.jpg"])).unwrap();
        store.update_photo(&ids[0], |p| p.mark_failed("no preview")).unwrap();

        assert!(store.set_selected(&ids[0], true).is_err());
        assert!(store.set_selected(&ids[0], false).is_ok());
    }

    #[test]
    fn test_reset_failed() {
        let (mut store, _) = memory_store();
        let ids = store.add_paths(paths(&["a.jpg", "b.jpg"])).unwrap();
        store.update_photo(&ids[0], |p| p.mark_failed("boom")).unwrap();
        store
            .update_photo(&ids[1], |p| {
                p.apply_outcome(AnalysisOutcome::Rated(AnalysisResult { rating: 4, ..Default::default() }), 3)
            })
            .unwrap();

        assert_eq!(store.reset_failed().unwrap(), 1);
        assert_eq!(store.pending_ids(), vec![ids[0].clone()]);
    }

    #[test]
    fn test_clear() {
        let (mut store, _) = memory_store();
        store.add_paths(paths(&["a.jpg", "b.jpg"])).unwrap();
        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.project().photos.is_empty());
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shoot.json");

        let mut store = ProjectStore::create(&path, "Shoot", false).unwrap();
        let ids = store.add_paths(paths(&["a.jpg"])).unwrap();
        store.set_rating_override(&ids[0], Some(2)).unwrap();
        assert_eq!(store.preview_dir(), Some(dir.path().join("shoot.previews")));

        let reopened = ProjectStore::open(&path).unwrap();
        assert_eq!(reopened.project().name, "Shoot");
        assert_eq!(reopened.project().photos[0].rating_override, Some(2));
        assert!(!dir.path().join("shoot.json.tmp").exists());
    }

    #[test]
    fn test_remove_and_clear_delete_cached_previews() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shoot.json");
        let mut store = ProjectStore::create(&path, "Shoot", false).unwrap();
        let ids = store.add_paths(paths(&["a.jpg", "b.jpg", "c.jpg"])).unwrap();

        let cache = store.preview_dir().unwrap();
        fs::create_dir_all(&cache).unwrap();
        for id in &ids {
            let preview = cache.join(format!("{}.jpg", id));
            fs::write(&preview, b"jpeg").unwrap();
            store
                .update_photo(id, |p| {
                    p.preview = Some(PreviewRef { path: preview, width: 1, height: 1, strategy: None })
                })
                .unwrap();
        }

        store.remove(&ids[0]).unwrap();
        assert!(!cache.join(format!("{}.jpg", ids[0])).exists());
        assert!(cache.join(format!("{}.jpg", ids[1])).exists());

        assert_eq!(store.clear().unwrap(), 2);
        assert!(!cache.exists());
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shoot.json");
        ProjectStore::create(&path, "one", false).unwrap();
        assert!(ProjectStore::create(&path, "two", false).is_err());
        assert!(ProjectStore::create(&path, "two", true).is_ok());
    }

    #[test]
    fn test_open_recovers_interrupted_photos() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shoot.json");
        let mut store = ProjectStore::create(&path, "s", false).unwrap();
        let ids = store.add_paths(paths(&["a.jpg"])).unwrap();
        store.update_photo(&ids[0], |p| p.status = PhotoStatus::Processing).unwrap();

        let reopened = ProjectStore::open(&path).unwrap();
        assert_eq!(reopened.project().photos[0].status, PhotoStatus::Pending);
    }
}
