// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Preview sanitization: reorient, downscale and recompress for the model

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::config::PreviewConfig;
use crate::Result;

/// A preview ready to send to the model
#[derive(Debug, Clone)]
pub struct SanitizedPreview {
    pub width: u32,
    pub height: u32,
    /// Recompressed JPEG
    pub jpeg: Vec<u8>,
    /// Standard base64 of `jpeg`
    pub base64: String,
}

/// Decode `bytes`, apply the EXIF orientation, fit within `max_edge` and re-encode as JPEG
pub fn sanitize(bytes: &[u8], orientation: u16, config: &PreviewConfig) -> Result<SanitizedPreview> {
    let img = image::load_from_memory(bytes)?;
    let img = reorient(img, orientation);
    let img = fit_within(img, config.max_edge);
    let (width, height) = img.dimensions();

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, config.jpeg_quality.clamp(1, 100)).encode_image(&rgb)?;

    debug!("Sanitized preview: {}x{}, {} bytes", width, height, jpeg.len());

    let base64 = general_purpose::STANDARD.encode(&jpeg);
    Ok(SanitizedPreview { width, height, jpeg, base64 })
}

/// Apply an EXIF orientation code; unknown codes leave the image untouched
pub fn reorient(mut img: DynamicImage, orientation: u16) -> DynamicImage {
    if let Some(o) = u8::try_from(orientation).ok().and_then(Orientation::from_exif) {
        img.apply_orientation(o);
    }
    img
}

/// Downscale so the long edge is at most `max_edge`; never upscales
pub fn fit_within(img: DynamicImage, max_edge: u32) -> DynamicImage {
    let max_edge = max_edge.max(1);
    if img.width() > max_edge || img.height() > max_edge {
        img.resize(max_edge, max_edge, FilterType::Triangle)
    } else {
        img
    }
}
