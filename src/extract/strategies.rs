// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Preview extraction strategies, tried in priority order

use exif::{Exif, In, Tag};
use image::ImageFormat;
use tracing::debug;

use super::jpeg::{find_embedded_jpegs, starts_with_soi};
use super::SourceFile;
use crate::{CullError, Result};

/// TIFF compression code for JPEG-compressed strips
const COMPRESSION_JPEG: u32 = 6;

/// How many scan candidates we attempt to decode before giving up
const MAX_SCAN_DECODES: usize = 8;

/// One way of pulling a preview out of a camera file
pub trait PreviewStrategy: Send + Sync {
    /// Name of this strategy
    fn name(&self) -> &'static str;

    /// Priority (higher = tried first)
    fn priority(&self) -> u8 {
        50
    }

    /// Return candidate preview bytes
    fn extract(&self, source: &SourceFile<'_>) -> Result<Vec<u8>>;
}

/// True when the bytes decode as an image
pub fn decodes(bytes: &[u8]) -> bool {
    image::load_from_memory(bytes).is_ok()
}

/// The file itself is an ordinary JPEG/PNG/WebP
pub struct DirectImage;

impl PreviewStrategy for DirectImage {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn priority(&self) -> u8 {
        100
    }

    fn extract(&self, source: &SourceFile<'_>) -> Result<Vec<u8>> {
        // TIFF-based RAWs would decode as their tiny IFD0 strip, so only accept real image formats
        match image::guess_format(source.bytes) {
            Ok(ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP) => Ok(source.bytes.to_vec()),
            _ => Err(CullError::NoPreview(source.name.to_string())),
        }
    }
}

/// Full-size preview referenced from the primary IFD of a TIFF-structured RAW
pub struct EmbeddedPreview;

impl PreviewStrategy for EmbeddedPreview {
    fn name(&self) -> &'static str {
        "embedded-preview"
    }

    fn priority(&self) -> u8 {
        80
    }

    fn extract(&self, source: &SourceFile<'_>) -> Result<Vec<u8>> {
        let exif = source.exif.ok_or_else(|| CullError::NoPreview(source.name.to_string()))?;

        if let Some(bytes) = interchange_jpeg(exif, In::PRIMARY) {
            return Ok(bytes);
        }

        let compression = exif
            .get_field(Tag::Compression, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0));
        if compression == Some(COMPRESSION_JPEG) {
            let offset = exif.get_field(Tag::StripOffsets, In::PRIMARY).and_then(|f| f.value.get_uint(0));
            let length = exif.get_field(Tag::StripByteCounts, In::PRIMARY).and_then(|f| f.value.get_uint(0));
            if let Some(bytes) = slice_jpeg(exif.buf(), offset, length) {
                return Ok(bytes);
            }
        }

        Err(CullError::NoPreview(source.name.to_string()))
    }
}

/// Small thumbnail stored in IFD1
pub struct ExifThumbnail;

impl PreviewStrategy for ExifThumbnail {
    fn name(&self) -> &'static str {
        "exif-thumbnail"
    }

    fn priority(&self) -> u8 {
        60
    }

    fn extract(&self, source: &SourceFile<'_>) -> Result<Vec<u8>> {
        source
            .exif
            .and_then(|exif| interchange_jpeg(exif, In::THUMBNAIL))
            .ok_or_else(|| CullError::NoPreview(source.name.to_string()))
    }
}

/// Last resort: scan the raw bytes for JPEG streams and take the largest that decodes
pub struct MarkerScan;

impl PreviewStrategy for MarkerScan {
    fn name(&self) -> &'static str {
        "marker-scan"
    }

    fn priority(&self) -> u8 {
        10
    }

    fn extract(&self, source: &SourceFile<'_>) -> Result<Vec<u8>> {
        let mut candidates = find_embedded_jpegs(source.bytes);
        debug!("{}: {} embedded JPEG candidates", source.name, candidates.len());
        candidates.sort_by_key(|r| std::cmp::Reverse(r.len()));

        candidates
            .into_iter()
            .take(MAX_SCAN_DECODES)
            .map(|r| &source.bytes[r])
            .find(|bytes| decodes(bytes))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| CullError::NoPreview(source.name.to_string()))
    }
}

fn interchange_jpeg(exif: &Exif, ifd: In) -> Option<Vec<u8>> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, ifd)
        .and_then(|f| f.value.get_uint(0));
    let length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, ifd)
        .and_then(|f| f.value.get_uint(0));
    slice_jpeg(exif.buf(), offset, length)
}

/// Offsets are relative to the TIFF header, which is the start of `buf`
fn slice_jpeg(buf: &[u8], offset: Option<u32>, length: Option<u32>) -> Option<Vec<u8>> {
    let start = offset? as usize;
    let end = start.checked_add(length? as usize)?;
    let bytes = buf.get(start..end)?;
    if starts_with_soi(bytes) {
        Some(bytes.to_vec())
    } else {
        None
    }
}

/// Default strategy set, in the order a camera file should be tried
pub fn default_strategies() -> Vec<Box<dyn PreviewStrategy>> {
    vec![
        Box::new(DirectImage),
        Box::new(EmbeddedPreview),
        Box::new(ExifThumbnail),
        Box::new(MarkerScan),
    ]
}
