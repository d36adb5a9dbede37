// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![allow(dead_code)]

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use photocull::analysis::{Analyzer, RetryPolicy, VisionModel};
use photocull::{CullError, Result};

const TIFF_SHORT: u16 = 3;
const TIFF_LONG: u16 = 4;
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_JPEG_OFFSET: u16 = 0x0201;
const TAG_JPEG_LENGTH: u16 = 0x0202;

pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 80)
        .encode_image(&img)
        .unwrap();
    buf
}

fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, value: u32) {
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
}

fn pad_to(out: &mut Vec<u8>, len: usize) {
    assert!(out.len() <= len);
    out.resize(len, 0);
}

/// Little-endian TIFF whose IFD0 points at `jpeg`, like a DNG or NEF preview
pub fn tiff_with_primary_preview(jpeg: &[u8], orientation: u16) -> Vec<u8> {
    const DATA: usize = 64;
    let mut out = b"II*\0".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&3u16.to_le_bytes());
    entry(&mut out, TAG_ORIENTATION, TIFF_SHORT, orientation as u32);
    entry(&mut out, TAG_JPEG_OFFSET, TIFF_LONG, DATA as u32);
    entry(&mut out, TAG_JPEG_LENGTH, TIFF_LONG, jpeg.len() as u32);
    out.extend_from_slice(&0u32.to_le_bytes());
    pad_to(&mut out, DATA);
    out.extend_from_slice(jpeg);
    out
}

/// Little-endian TIFF with the JPEG only in IFD1
pub fn tiff_with_thumbnail(jpeg: &[u8]) -> Vec<u8> {
    const IFD1: usize = 32;
    const DATA: usize = 64;
    let mut out = b"II*\0".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    entry(&mut out, TAG_ORIENTATION, TIFF_SHORT, 1);
    out.extend_from_slice(&(IFD1 as u32).to_le_bytes());
    pad_to(&mut out, IFD1);
    out.extend_from_slice(&2u16.to_le_bytes());
    entry(&mut out, TAG_JPEG_OFFSET, TIFF_LONG, DATA as u32);
    entry(&mut out, TAG_JPEG_LENGTH, TIFF_LONG, jpeg.len() as u32);
    out.extend_from_slice(&0u32.to_le_bytes());
    pad_to(&mut out, DATA);
    out.extend_from_slice(jpeg);
    out
}

/// TIFF field value for [`tiff_with_exif`]
#[derive(Debug, Clone)]
pub enum TiffValue {
    Short(u16),
    Long(u32),
    Ascii(&'static str),
    Rational(u32, u32),
}

impl TiffValue {
    fn kind(&self) -> u16 {
        match self {
            TiffValue::Ascii(_) => 2,
            TiffValue::Short(_) => TIFF_SHORT,
            TiffValue::Long(_) => TIFF_LONG,
            TiffValue::Rational(..) => 5,
        }
    }

    fn count(&self) -> u32 {
        match self {
            TiffValue::Ascii(s) => s.len() as u32 + 1,
            _ => 1,
        }
    }

    fn payload(&self) -> Vec<u8> {
        match self {
            TiffValue::Short(v) => v.to_le_bytes().to_vec(),
            TiffValue::Long(v) => v.to_le_bytes().to_vec(),
            TiffValue::Ascii(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                bytes
            }
            TiffValue::Rational(num, denom) => {
                let mut bytes = num.to_le_bytes().to_vec();
                bytes.extend_from_slice(&denom.to_le_bytes());
                bytes
            }
        }
    }
}

fn ifd_len(entries: &[(u16, TiffValue)]) -> usize {
    let data: usize = entries
        .iter()
        .map(|(_, v)| v.payload().len())
        .filter(|len| *len > 4)
        .map(|len| len + len % 2)
        .sum();
    2 + 12 * entries.len() + 4 + data
}

/// Write an IFD at the end of `out` with its out-of-line values right after it
fn write_ifd(out: &mut Vec<u8>, entries: &mut Vec<(u16, TiffValue)>) {
    entries.sort_by_key(|(tag, _)| *tag);
    let mut data_offset = out.len() + 2 + 12 * entries.len() + 4;
    let mut data = Vec::new();

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, value) in entries.iter() {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&value.kind().to_le_bytes());
        out.extend_from_slice(&value.count().to_le_bytes());
        let mut payload = value.payload();
        if payload.len() <= 4 {
            payload.resize(4, 0);
            out.extend_from_slice(&payload);
        } else {
            out.extend_from_slice(&(data_offset as u32).to_le_bytes());
            if payload.len() % 2 == 1 {
                payload.push(0);
            }
            data_offset += payload.len();
            data.extend_from_slice(&payload);
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&data);
}

/// TIFF RAW with the given IFD0 and Exif IFD tags and `jpeg` as its preview
pub fn tiff_with_exif(ifd0: &[(u16, TiffValue)], exif: &[(u16, TiffValue)], jpeg: &[u8]) -> Vec<u8> {
    const TAG_EXIF_POINTER: u16 = 0x8769;

    let mut primary = ifd0.to_vec();
    primary.push((TAG_EXIF_POINTER, TiffValue::Long(0)));
    primary.push((TAG_JPEG_OFFSET, TiffValue::Long(0)));
    primary.push((TAG_JPEG_LENGTH, TiffValue::Long(jpeg.len() as u32)));

    let exif_offset = 8 + ifd_len(&primary);
    let jpeg_offset = exif_offset + ifd_len(exif);
    for (tag, value) in primary.iter_mut() {
        match *tag {
            TAG_EXIF_POINTER => *value = TiffValue::Long(exif_offset as u32),
            TAG_JPEG_OFFSET => *value = TiffValue::Long(jpeg_offset as u32),
            _ => {}
        }
    }

    let mut out = b"II*\0".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());
    write_ifd(&mut out, &mut primary);
    assert_eq!(out.len(), exif_offset);
    write_ifd(&mut out, &mut exif.to_vec());
    assert_eq!(out.len(), jpeg_offset);
    out.extend_from_slice(jpeg);
    out
}

/// Unknown container with a JPEG somewhere in the middle, like CR3 or RAF
pub fn opaque_raw_with_jpeg(jpeg: &[u8]) -> Vec<u8> {
    let mut out = b"FUJIFILMCCD-RAW ".to_vec();
    out.extend(std::iter::repeat(0x5A).take(1000));
    out.extend_from_slice(jpeg);
    out.extend(std::iter::repeat(0xA5).take(1000));
    out
}

/// Model stub that replays a script, then repeats the fallback
pub struct StubModel {
    replies: Mutex<VecDeque<Result<String>>>,
    fallback: fn() -> Result<String>,
    pub calls: Arc<AtomicU32>,
}

impl StubModel {
    pub fn new(replies: Vec<Result<String>>, fallback: fn() -> Result<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn rated(ratings: &[u8]) -> Self {
        let replies = ratings
            .iter()
            .map(|r| Ok(format!(r#"{{"rating": {}, "exposure": 0.5, "reason": "stub", "keywords": ["test"]}}"#, r)))
            .collect();
        Self::new(replies, || Err(CullError::RateLimited(429)))
    }
}

#[async_trait]
impl VisionModel for StubModel {
    async fn generate(&self, _prompt: &str, image_base64: &str) -> Result<String> {
        assert!(!image_base64.is_empty());
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(self.fallback)
    }
}

pub fn instant_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        multiplier: 2.0,
        jitter: true,
    }
}

pub fn stub_analyzer(model: StubModel, max_attempts: u32) -> (Analyzer, Arc<AtomicU32>) {
    let calls = model.calls.clone();
    (Analyzer::new(Box::new(model), instant_policy(max_attempts), "rate this photo"), calls)
}
