// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Shooting metadata pulled from EXIF

use chrono::NaiveDateTime;
use exif::{Exif, Field, In, Tag, Value};
use serde::{Deserialize, Serialize};

/// Shown in place of any value the camera did not record
pub const PLACEHOLDER: &str = "--";

/// Capture settings for one photo; every field is optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShootingMetadata {
    pub iso: Option<u32>,
    /// f-number, e.g. 2.8
    pub aperture: Option<f64>,
    /// Human readable exposure time, e.g. `1/250` or `2"`
    pub shutter: Option<String>,
    pub captured_at: Option<NaiveDateTime>,
    /// EXIF orientation code 1-8
    #[serde(default = "default_orientation")]
    pub orientation: u16,
    pub camera: Option<String>,
    pub lens: Option<String>,
    pub focal_length_mm: Option<f64>,
}

fn default_orientation() -> u16 {
    1
}

impl Default for ShootingMetadata {
    fn default() -> Self {
        Self {
            iso: None,
            aperture: None,
            shutter: None,
            captured_at: None,
            orientation: default_orientation(),
            camera: None,
            lens: None,
            focal_length_mm: None,
        }
    }
}

impl ShootingMetadata {
    /// Build from parsed EXIF, ignoring any field that fails to parse
    pub fn from_exif(exif: &Exif) -> Self {
        let field = |tag: Tag| exif.get_field(tag, In::PRIMARY);

        let iso = field(Tag::PhotographicSensitivity).and_then(|f| f.value.get_uint(0));
        let aperture = field(Tag::FNumber).and_then(rational).filter(|f| *f > 0.0);
        let shutter = field(Tag::ExposureTime).and_then(format_exposure);
        let captured_at = field(Tag::DateTimeOriginal)
            .or_else(|| field(Tag::DateTime))
            .and_then(ascii)
            .and_then(|s| parse_exif_datetime(&s));
        let orientation = field(Tag::Orientation)
            .and_then(|f| f.value.get_uint(0))
            .filter(|o| (1..=8).contains(o))
            .map(|o| o as u16)
            .unwrap_or(1);

        let make = field(Tag::Make).and_then(ascii);
        let model = field(Tag::Model).and_then(ascii);
        let camera = match (make, model) {
            // Most bodies already repeat the make in the model string
            (Some(make), Some(model)) if model.starts_with(make.split_whitespace().next().unwrap_or("")) => {
                Some(model)
            }
            (Some(make), Some(model)) => Some(format!("{} {}", make, model)),
            (make, model) => model.or(make),
        };

        Self {
            iso,
            aperture,
            shutter,
            captured_at,
            orientation,
            camera,
            lens: field(Tag::LensModel).and_then(ascii),
            focal_length_mm: field(Tag::FocalLength).and_then(rational).filter(|f| *f > 0.0),
        }
    }

    pub fn iso_label(&self) -> String {
        self.iso.map(|i| format!("ISO {}", i)).unwrap_or_else(|| format!("ISO {}", PLACEHOLDER))
    }

    pub fn aperture_label(&self) -> String {
        self.aperture
            .map(|f| format!("f/{}", trim_float(f)))
            .unwrap_or_else(|| format!("f/{}", PLACEHOLDER))
    }

    pub fn shutter_label(&self) -> String {
        self.shutter.clone().unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn captured_label(&self) -> String {
        self.captured_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    /// One-line summary, e.g. `ISO 200 · f/2.8 · 1/250 · 2024-05-01 10:00:00`
    pub fn summary(&self) -> String {
        format!(
            "{} · {} · {} · {}",
            self.iso_label(),
            self.aperture_label(),
            self.shutter_label(),
            self.captured_label()
        )
    }
}

fn rational(field: &Field) -> Option<f64> {
    match field.value {
        Value::Rational(ref v) if !v.is_empty() && v[0].denom != 0 => Some(v[0].to_f64()),
        _ => None,
    }
}

fn ascii(field: &Field) -> Option<String> {
    match field.value {
        Value::Ascii(ref v) if !v.is_empty() => {
            let s = String::from_utf8_lossy(&v[0])
                .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string();
            if s.is_empty() { None } else { Some(s) }
        }
        _ => None,
    }
}

fn format_exposure(field: &Field) -> Option<String> {
    let r = match field.value {
        Value::Rational(ref v) if !v.is_empty() => v[0],
        _ => return None,
    };
    if r.num == 0 || r.denom == 0 {
        return None;
    }
    Some(shutter_text(r.to_f64()))
}

/// `1/N` for fractional stops like 1/250 or 1/3, decimal seconds otherwise
fn shutter_text(seconds: f64) -> String {
    let reciprocal = 1.0 / seconds;
    if seconds < 1.0 && ((reciprocal - reciprocal.round()).abs() < 0.05 || reciprocal >= 4.0) {
        format!("1/{}", reciprocal.round() as u64)
    } else {
        format!("{}\"", trim_float(seconds))
    }
}

/// Parse `YYYY:MM:DD HH:MM:SS`
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y:%m:%d %H:%M:%S").ok()
}

fn trim_float(v: f64) -> String {
    let s = format!("{:.1}", v);
    s.strip_suffix(".0").map(String::from).unwrap_or(s)
}
