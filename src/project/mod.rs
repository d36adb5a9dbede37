// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Culling projects and photo records

pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use store::{JsonFileHook, MemoryHook, ProjectStore, SaveHook};

use crate::analysis::{AnalysisOutcome, AnalysisResult};
use crate::extract::ShootingMetadata;
use crate::CullError;

/// Hex digits of the path hash used as a photo id
const PHOTO_ID_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PhotoStatus {
    pub const ALL: [PhotoStatus; 4] = [
        PhotoStatus::Pending,
        PhotoStatus::Processing,
        PhotoStatus::Completed,
        PhotoStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoStatus::Pending => "pending",
            PhotoStatus::Processing => "processing",
            PhotoStatus::Completed => "completed",
            PhotoStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PhotoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoStatus {
    type Err = CullError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhotoStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CullError::Config(format!("unknown status '{}'", s)))
    }
}

/// Cached sanitized preview on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRef {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Strategy that found the embedded image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub path: PathBuf,
    pub file_name: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub preview: Option<PreviewRef>,
    #[serde(default)]
    pub metadata: ShootingMetadata,
    pub status: PhotoStatus,
    #[serde(default)]
    pub analysis: Option<AnalysisOutcome>,
    /// Manual rating; wins over the model's
    #[serde(default)]
    pub rating_override: Option<u8>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl PhotoRecord {
    /// A pending record for `path`, which should already be canonical
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            id: photo_id(&path),
            path,
            file_name,
            added_at: Utc::now(),
            preview: None,
            metadata: ShootingMetadata::default(),
            status: PhotoStatus::Pending,
            analysis: None,
            rating_override: None,
            selected: false,
            error: None,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref().and_then(AnalysisOutcome::result)
    }

    pub fn model_rating(&self) -> Option<u8> {
        self.result().map(|r| r.rating)
    }

    /// Manual override if set, else the model rating
    pub fn displayed_rating(&self) -> Option<u8> {
        self.rating_override.or_else(|| self.model_rating())
    }

    /// Completed with a real rating, and selected unless `include_unselected`
    pub fn is_exportable(&self, include_unselected: bool) -> bool {
        self.status == PhotoStatus::Completed
            && self.result().is_some()
            && (self.selected || include_unselected)
    }

    /// Record a failure; failed photos are never selected
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = PhotoStatus::Failed;
        self.selected = false;
        self.error = Some(reason.into());
    }

    /// Store the model's verdict and settle status and selection
    pub fn apply_outcome(&mut self, outcome: AnalysisOutcome, auto_select_min_rating: u8) {
        match &outcome {
            AnalysisOutcome::Rated(result) => {
                self.status = PhotoStatus::Completed;
                self.error = None;
                self.selected = self.rating_override.unwrap_or(result.rating) >= auto_select_min_rating;
            }
            AnalysisOutcome::Failed { reason, attempts } => {
                self.mark_failed(format!("{} (after {} attempt(s))", reason, attempts));
            }
        }
        self.analysis = Some(outcome);
    }

    /// Back to pending, keeping any manual override
    pub fn reset(&mut self) {
        self.status = PhotoStatus::Pending;
        self.analysis = None;
        self.error = None;
        self.selected = false;
    }
}

/// Stable id derived from the photo's path
pub fn photo_id(path: &Path) -> String {
    let hash = blake3::hash(path.to_string_lossy().as_bytes());
    hash.to_hex()[..PHOTO_ID_LEN].to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub photos: Vec<PhotoRecord>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            modified_at: now,
            photos: Vec::new(),
        }
    }

    pub fn photo(&self, id: &str) -> Option<&PhotoRecord> {
        self.photos.iter().find(|p| p.id == id)
    }

    pub fn photo_mut(&mut self, id: &str) -> Option<&mut PhotoRecord> {
        self.photos.iter_mut().find(|p| p.id == id)
    }

    /// Resolve a full id or an unambiguous prefix
    pub fn resolve_id(&self, query: &str) -> Option<String> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(photo) = self.photo(query) {
            return Some(photo.id.clone());
        }
        let mut matches = self.photos.iter().filter(|p| p.id.starts_with(query));
        match (matches.next(), matches.next()) {
            (Some(photo), None) => Some(photo.id.clone()),
            _ => None,
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for photo in &self.photos {
            match photo.status {
                PhotoStatus::Pending => summary.pending += 1,
                PhotoStatus::Processing => summary.processing += 1,
                PhotoStatus::Completed => summary.completed += 1,
                PhotoStatus::Failed => summary.failed += 1,
            }
            if photo.selected {
                summary.selected += 1;
            }
        }
        summary.total = self.photos.len();
        summary
    }
}

/// Photo counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub selected: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} photos: {} completed, {} failed, {} pending, {} selected",
            self.total,
            self.completed,
            self.failed,
            self.pending + self.processing,
            self.selected
        )
    }
}
