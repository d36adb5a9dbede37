// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Sequential processing queue
//!
//! One photo at a time: mark it processing and persist, extract, sanitize,
//! analyze, then merge the result and persist again. A fixed pause between
//! photos keeps request rates under the API quota. Per-photo failures are
//! recorded on the photo; only a failed save stops the run.

use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisOutcome, Analyzer};
use crate::config::{AppConfig, PreviewConfig};
use crate::extract::{Extraction, Extractor};
use crate::preview::{sanitize, SanitizedPreview};
use crate::project::{PhotoStatus, PreviewRef, ProjectStore};
use crate::{CullError, Result};

/// Counts for one queue run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct Queue {
    extractor: Extractor,
    /// Construction error is kept so each photo can report it
    analyzer: std::result::Result<Analyzer, String>,
    preview: PreviewConfig,
    delay: Duration,
    auto_select_min_rating: u8,
}

impl Queue {
    pub fn new(config: &AppConfig, analyzer: Result<Analyzer>) -> Self {
        let analyzer = analyzer.map_err(|e| {
            warn!("Analysis unavailable: {}", e);
            e.to_string()
        });
        if let Ok(analyzer) = &analyzer {
            debug!("Up to {} model calls per photo", analyzer.policy().attempts());
        }

        Self {
            extractor: Extractor::new(),
            analyzer,
            preview: config.preview.clone(),
            delay: Duration::from_millis(config.queue.delay_ms),
            auto_select_min_rating: config.queue.auto_select_min_rating,
        }
    }

    /// Queue with a Gemini analyzer built from the config
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config, Analyzer::from_config(config))
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Process pending photos, or just `only` when given
    ///
    /// Named photos that are not pending are skipped.
    pub async fn run(&self, store: &mut ProjectStore, only: &[String]) -> Result<RunReport> {
        let ids = if only.is_empty() {
            store.pending_ids()
        } else {
            let mut ids = Vec::with_capacity(only.len());
            for query in only {
                ids.push(store.resolve(query)?);
            }
            ids
        };

        let mut report = RunReport::default();
        let total = ids.len();
        info!("Processing {} photo(s)", total);

        for (index, id) in ids.iter().enumerate() {
            let status = store.project().photo(id).map(|p| p.status);
            if status != Some(PhotoStatus::Pending) {
                warn!("Skipping {}: not pending", id);
                report.skipped += 1;
                continue;
            }

            if report.processed > 0 && !self.delay.is_zero() {
                debug!("Waiting {:?} before next photo", self.delay);
                tokio::time::sleep(self.delay).await;
            }

            info!("[{}/{}] {}", index + 1, total, id);
            match self.process_one(store, id).await? {
                PhotoStatus::Completed => report.completed += 1,
                _ => report.failed += 1,
            }
            report.processed += 1;
        }

        info!(
            "Run finished: {} completed, {} failed, {} skipped",
            report.completed, report.failed, report.skipped
        );
        Ok(report)
    }

    /// Run one photo through the pipeline and return its final status
    pub async fn process_one(&self, store: &mut ProjectStore, id: &str) -> Result<PhotoStatus> {
        let path = store.update_photo(id, |photo| {
            photo.status = PhotoStatus::Processing;
            photo.error = None;
            photo.path.clone()
        })?;

        let extraction = match self.extractor.extract_file(&path) {
            Ok(extraction) => extraction,
            Err(e) => return self.fail(store, id, e.to_string()),
        };
        let metadata = extraction.metadata.clone();
        store.update_photo(id, |photo| photo.metadata = metadata)?;

        let (sanitized, strategy) = match self.prepare(&path, extraction) {
            Ok(prepared) => prepared,
            Err(e) => return self.fail(store, id, e.to_string()),
        };

        let preview_ref = store
            .preview_dir()
            .and_then(|dir| cache_preview(&dir, id, &sanitized, strategy));

        let outcome = match &self.analyzer {
            Ok(analyzer) => analyzer.analyze(&sanitized.base64).await,
            Err(reason) => AnalysisOutcome::Failed { reason: reason.clone(), attempts: 0 },
        };

        let min_rating = self.auto_select_min_rating;
        store.update_photo(id, |photo| {
            photo.preview = preview_ref;
            photo.apply_outcome(outcome, min_rating);
            match photo.status {
                PhotoStatus::Completed => info!(
                    "{}: {} stars{}",
                    photo.file_name,
                    photo.model_rating().unwrap_or(0),
                    if photo.selected { ", selected" } else { "" }
                ),
                _ => warn!("{}: {}", photo.file_name, photo.error.as_deref().unwrap_or("failed")),
            }
            photo.status
        })
    }

    fn prepare(&self, path: &Path, extraction: Extraction) -> Result<(SanitizedPreview, Option<&'static str>)> {
        let bytes = extraction
            .preview
            .ok_or_else(|| CullError::NoPreview(path.display().to_string()))?;
        let sanitized = sanitize(&bytes, extraction.metadata.orientation, &self.preview)?;
        Ok((sanitized, extraction.strategy))
    }

    fn fail(&self, store: &mut ProjectStore, id: &str, reason: String) -> Result<PhotoStatus> {
        store.update_photo(id, |photo| {
            warn!("{}: {}", photo.file_name, reason);
            photo.mark_failed(reason);
            photo.status
        })
    }
}

/// Write the sanitized JPEG to the preview cache; a failed write only loses the cache
fn cache_preview(dir: &Path, id: &str, preview: &SanitizedPreview, strategy: Option<&'static str>) -> Option<PreviewRef> {
    let path = dir.join(format!("{}.jpg", id));
    let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, &preview.jpeg));
    match written {
        Ok(()) => Some(PreviewRef {
            path,
            width: preview.width,
            height: preview.height,
            strategy: strategy.map(String::from),
        }),
        Err(e) => {
            warn!("Could not cache preview {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::{fast_policy, ScriptedModel};
    use crate::extract::strategies::DirectImage;
    use crate::extract::jpeg::tests::sample_jpeg;
    use crate::project::{MemoryHook, Project};
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.queue.delay_ms = 0;
        config
    }

    fn queue(replies: fn() -> Result<String>) -> (Queue, std::sync::Arc<std::sync::atomic::AtomicU32>) {
        let model = ScriptedModel::new(vec![], replies);
        let calls = model.calls.clone();
        let analyzer = Analyzer::new(Box::new(model), fast_policy(2), "rate");
        (Queue::new(&config(), Ok(analyzer)), calls)
    }

    fn store_with(files: &[PathBuf]) -> ProjectStore {
        let mut store = ProjectStore::with_hook(Project::new("t"), Box::new(MemoryHook::new()));
        store.add_paths(files.to_vec()).unwrap();
        store
    }

    #[tokio::test]
    async fn test_jpeg_is_rated_and_selected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        std::fs::write(&file, sample_jpeg(64, 48)).unwrap();

        let (queue, calls) = queue(|| Ok(r#"{"rating": 4, "reason": "nice"}"#.to_string()));
        let mut store = store_with(&[file]);
        let report = queue.run(&mut store, &[]).await.unwrap();

        assert_eq!(report.completed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let photo = &store.project().photos[0];
        assert_eq!(photo.status, PhotoStatus::Completed);
        assert!(photo.selected);
        assert_eq!(photo.displayed_rating(), Some(4));
    }

    #[tokio::test]
    async fn test_no_preview_fails_without_model_call() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.cr2");
        std::fs::write(&file, vec![0u8; 2048]).unwrap();

        let (queue, calls) = queue(|| Ok(r#"{"rating": 5}"#.to_string()));
        let mut store = store_with(&[file]);
        let report = queue.run(&mut store, &[]).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let photo = &store.project().photos[0];
        assert_eq!(photo.status, PhotoStatus::Failed);
        assert!(!photo.selected);
        assert!(!photo.is_exportable(true));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_every_photo() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..3)
            .map(|i| {
                let f = dir.path().join(format!("{}.jpg", i));
                std::fs::write(&f, sample_jpeg(32, 32)).unwrap();
                f
            })
            .collect();

        let queue = Queue::new(&config(), Err(CullError::MissingApiKey("GEMINI_API_KEY".to_string())));
        let mut store = store_with(&files);
        let report = queue.run(&mut store, &[]).await.unwrap();

        assert_eq!(report.failed, 3);
        for photo in &store.project().photos {
            assert_eq!(photo.status, PhotoStatus::Failed);
            assert!(photo.error.as_deref().unwrap().contains("GEMINI_API_KEY"));
        }
    }

    #[tokio::test]
    async fn test_named_photo_must_be_pending() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.jpg");
        std::fs::write(&file, sample_jpeg(16, 16)).unwrap();

        let (queue, _) = queue(|| Ok(r#"{"rating": 1}"#.to_string()));
        let mut store = store_with(&[file]);
        let id = store.project().photos[0].id.clone();

        queue.run(&mut store, &[id.clone()]).await.unwrap();
        let again = queue.run(&mut store, &[id]).await.unwrap();
        assert_eq!(again.skipped, 1);
        assert!(matches!(queue.run(&mut store, &["nope".to_string()]).await, Err(CullError::PhotoNotFound(_))));
    }

    #[tokio::test]
    async fn test_custom_extractor_limits_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("wrapped.raf");
        let mut raw = vec![0x11u8; 256];
        raw.extend_from_slice(&sample_jpeg(32, 32));
        std::fs::write(&file, raw).unwrap();

        let (queue, calls) = queue(|| Ok(r#"{"rating": 2}"#.to_string()));
        let queue = queue.with_extractor(Extractor::with_strategies(vec![Box::new(DirectImage)]));
        let mut store = store_with(&[file]);
        let report = queue.run(&mut store, &[]).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_source_file_fails_photo() {
        let (queue, _) = queue(|| Ok(r#"{"rating": 1}"#.to_string()));
        let mut store = store_with(&[PathBuf::from("/nonexistent/gone.nef")]);
        let report = queue.run(&mut store, &[]).await.unwrap();
        assert_eq!(report.failed, 1);
    }
}
