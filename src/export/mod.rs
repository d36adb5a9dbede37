// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Sidecar export: a zip bundle, or `.xmp` files beside the originals

pub mod xmp;

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::project::{PhotoRecord, Project};
use crate::Result;

pub use xmp::SidecarContent;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Export completed photos even when unselected
    pub include_unselected: bool,
    /// Write next to each source file instead of into an archive
    pub in_place: bool,
    /// Replace sidecars that already exist beside the source files
    pub overwrite: bool,
}

/// One rendered sidecar
#[derive(Debug, Clone)]
pub struct Sidecar {
    pub photo_id: String,
    pub source: PathBuf,
    /// File name, unique within its target directory
    pub name: String,
    pub rating: u8,
    pub xml: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub written: usize,
    pub skipped: usize,
    /// Archive path, or each sidecar path when exporting in place
    pub outputs: Vec<PathBuf>,
}

/// Render sidecars for every eligible photo, in project order
pub fn build_sidecars(project: &Project, options: &ExportOptions) -> Result<Vec<Sidecar>> {
    let mut names = SidecarNames::default();
    let mut sidecars = Vec::new();

    for photo in project.photos.iter().filter(|p| p.is_exportable(options.include_unselected)) {
        let (Some(analysis), Some(rating)) = (photo.result(), photo.displayed_rating()) else {
            continue;
        };

        let scope = if options.in_place {
            photo.path.parent().map(Path::to_path_buf).unwrap_or_default()
        } else {
            PathBuf::new()
        };

        let xml = xmp::render(&SidecarContent { rating, analysis })?;
        sidecars.push(Sidecar {
            photo_id: photo.id.clone(),
            source: photo.path.clone(),
            name: names.assign(scope, stem(photo)),
            rating,
            xml,
        });
    }

    debug!("{} of {} photos eligible for export", sidecars.len(), project.photos.len());
    Ok(sidecars)
}

/// Write all sidecars into a deflated zip archive
pub fn write_zip(sidecars: &[Sidecar], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(output)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for sidecar in sidecars {
        zip.start_file(sidecar.name.as_str(), options)?;
        zip.write_all(sidecar.xml.as_bytes())?;
    }
    zip.finish()?;

    info!("Wrote {} sidecar(s) to {}", sidecars.len(), output.display());
    Ok(())
}

/// Write each sidecar beside its source file; returns the paths written
///
/// Existing sidecars are kept unless `overwrite` is set.
pub fn write_in_place(sidecars: &[Sidecar], overwrite: bool) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(sidecars.len());
    for sidecar in sidecars {
        let dir = sidecar.source.parent().unwrap_or_else(|| Path::new("."));
        let path = dir.join(&sidecar.name);
        if path.exists() {
            if !overwrite {
                warn!("Keeping existing {} (use --overwrite to replace it)", path.display());
                continue;
            }
            warn!("Overwriting {}", path.display());
        }
        std::fs::write(&path, &sidecar.xml)?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }
    info!("Wrote {} sidecar(s) beside their photos", written.len());
    Ok(written)
}

/// Build and write sidecars for a project
pub fn export(project: &Project, output: Option<&Path>, options: &ExportOptions) -> Result<ExportReport> {
    let sidecars = build_sidecars(project, options)?;

    let (written, outputs) = if options.in_place {
        let paths = write_in_place(&sidecars, options.overwrite)?;
        (paths.len(), paths)
    } else {
        let output = output.map(Path::to_path_buf).unwrap_or_else(|| default_archive_name(project));
        write_zip(&sidecars, &output)?;
        (sidecars.len(), vec![output])
    };

    Ok(ExportReport {
        written,
        skipped: project.photos.len() - written,
        outputs,
    })
}

/// `<project name>-xmp.zip`, with path-hostile characters replaced
pub fn default_archive_name(project: &Project) -> PathBuf {
    let name: String = project
        .name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let name = if name.is_empty() { "photocull".to_string() } else { name };
    PathBuf::from(format!("{}-xmp.zip", name))
}

fn stem(photo: &PhotoRecord) -> String {
    Path::new(&photo.file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| photo.id.clone())
}

/// Hands out `stem.xmp`, then `stem_2.xmp`, `stem_3.xmp` within each scope
#[derive(Default)]
struct SidecarNames {
    used: HashMap<PathBuf, HashSet<String>>,
}

impl SidecarNames {
    fn assign(&mut self, scope: PathBuf, stem: String) -> String {
        let used = self.used.entry(scope).or_default();
        let mut name = format!("{}.xmp", stem);
        let mut n = 2;
        // Case-insensitive filesystems treat IMG.xmp and img.xmp as one file
        while !used.insert(name.to_lowercase()) {
            name = format!("{}_{}.xmp", stem, n);
            n += 1;
        }
        name
    }
}
