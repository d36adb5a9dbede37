// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Expands command-line paths into camera files

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::Result;

/// Camera file extensions we know how to pull a preview from
pub const CAMERA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "cr2", "cr3", "crw", "nef", "nrw", "arw", "srf", "sr2", "dng", "raf",
    "orf", "rw2", "pef", "srw", "x3f", "3fr", "iiq", "erf", "kdc", "mrw",
];

/// Check if a path looks like a camera file
pub fn is_camera_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| CAMERA_EXTENSIONS.iter().any(|c| c.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Check if a file should be processed
pub fn should_process(path: &Path) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    // Skip hidden files (also macOS "._" resource forks)
    if filename.starts_with('.') {
        return false;
    }

    let temp_extensions = [".tmp", ".part", ".crdownload", ".partial", ".download"];
    if temp_extensions.iter().any(|ext| filename.ends_with(ext)) {
        return false;
    }

    let skip_names = ["desktop.ini", "thumbs.db", ".ds_store"];
    if skip_names.iter().any(|n| filename.eq_ignore_ascii_case(n)) {
        return false;
    }

    true
}

/// Collect camera files from files and directories, sorted by path
pub fn collect_camera_files(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            walk(input, recursive, &mut files)?;
        } else if input.is_file() {
            if should_process(input) && is_camera_file(input) {
                files.push(input.clone());
            } else {
                warn!("Skipping unsupported file: {:?}", input);
            }
        } else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", input.display()),
            )
            .into());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<()> {
    let walker = WalkDir::new(dir)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || should_process(e.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let p = entry.path();
        if p.is_dir() {
            continue;
        }
        if p.is_file() && should_process(p) && is_camera_file(p) {
            files.push(p.to_path_buf());
        } else {
            debug!("Ignoring {:?}", p);
        }
    }
    Ok(())
}
