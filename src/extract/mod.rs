// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Preview and metadata extraction from camera files
//!
//! Extraction is best effort: a file with no usable preview yields
//! `preview: None` and placeholder metadata rather than an error. Only an
//! unreadable file is an error.

pub mod jpeg;
pub mod metadata;
pub mod strategies;

use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

pub use metadata::ShootingMetadata;
pub use strategies::{default_strategies, PreviewStrategy};

use crate::Result;

/// A camera file loaded into memory, handed to each strategy
pub struct SourceFile<'a> {
    /// Display name for logs and errors
    pub name: &'a str,
    pub bytes: &'a [u8],
    /// Parsed EXIF, when the container has any
    pub exif: Option<&'a exif::Exif>,
}

/// Outcome of extraction for one file
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Encoded preview image (usually JPEG)
    pub preview: Option<Vec<u8>>,
    /// Name of the strategy that produced the preview
    pub strategy: Option<&'static str>,
    pub metadata: ShootingMetadata,
}

/// Runs preview strategies in priority order
pub struct Extractor {
    strategies: Vec<Box<dyn PreviewStrategy>>,
}

impl Extractor {
    /// Create an extractor with the default strategies
    pub fn new() -> Self {
        let mut extractor = Self { strategies: Vec::new() };
        for strategy in default_strategies() {
            extractor.register(strategy);
        }
        extractor
    }

    /// Create an extractor with an explicit strategy list
    pub fn with_strategies(strategies: Vec<Box<dyn PreviewStrategy>>) -> Self {
        let mut extractor = Self { strategies: Vec::new() };
        for strategy in strategies {
            extractor.register(strategy);
        }
        extractor
    }

    /// Register a strategy
    pub fn register(&mut self, strategy: Box<dyn PreviewStrategy>) {
        self.strategies.push(strategy);
        // Stable sort keeps registration order among equal priorities
        self.strategies.sort_by_key(|s| std::cmp::Reverse(s.priority()));
    }

    /// Strategy names in evaluation order
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Read a file and extract from it
    pub fn extract_file(&self, path: &Path) -> Result<Extraction> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(self.extract_bytes(&name, &bytes))
    }

    /// Extract from an in-memory file; never fails
    pub fn extract_bytes(&self, name: &str, bytes: &[u8]) -> Extraction {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(bytes)) {
            Ok(exif) => Some(exif),
            Err(e) => {
                debug!("{}: no EXIF ({})", name, e);
                None
            }
        };

        let metadata = exif
            .as_ref()
            .map(ShootingMetadata::from_exif)
            .unwrap_or_default();

        let source = SourceFile { name, bytes, exif: exif.as_ref() };

        for strategy in &self.strategies {
            match strategy.extract(&source) {
                Ok(preview) if strategies::decodes(&preview) => {
                    info!("{}: preview via {} ({} bytes)", name, strategy.name(), preview.len());
                    return Extraction {
                        preview: Some(preview),
                        strategy: Some(strategy.name()),
                        metadata,
                    };
                }
                Ok(_) => debug!("{}: {} produced undecodable bytes", name, strategy.name()),
                Err(e) => debug!("{}: {} found nothing ({})", name, strategy.name(), e),
            }
        }

        warn!("{}: no usable preview found", name);
        Extraction { preview: None, strategy: None, metadata }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
