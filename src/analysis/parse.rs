// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Lenient parsing of model replies
//!
//! Models do not always honor the response schema: numbers arrive as
//! strings, ratings as "4 stars", keywords as one comma-separated string.
//! Anything we can read is coerced into range; anything we can't falls back
//! to zero or empty. Only a reply without a JSON object is an error.

use serde_json::{Map, Value};

use super::types::{AnalysisResult, ToneAdjustments, MAX_RATING};
use crate::{CullError, Result};

const EXPOSURE_RANGE: f64 = 5.0;
const SLIDER_RANGE: f64 = 100.0;
const MAX_KEYWORDS: usize = 20;

/// Candidate JSON slices of a reply, most likely first
///
/// A fenced ```json block, then the outermost `{ ... }`, then `[ ... ]`.
fn json_candidates(reply: &str) -> Vec<&str> {
    let mut candidates = Vec::new();

    if let Some(start_marker) = reply.find("```json") {
        let start = start_marker + "```json".len();
        if let Some(end_offset) = reply[start..].find("```") {
            let block = reply[start..start + end_offset].trim();
            if !block.is_empty() {
                candidates.push(block);
            }
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (reply.find(open), reply.rfind(close)) {
            if end > start {
                candidates.push(&reply[start..=end]);
            }
        }
    }

    candidates
}

fn into_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        // Some models wrap the answer in a one-element array
        Value::Array(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

/// Parse a model reply into an analysis result
pub fn parse_reply(reply: &str) -> Result<AnalysisResult> {
    let mut failure = "no JSON object in reply".to_string();

    for json in json_candidates(reply) {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => match into_object(value) {
                Some(object) => return Ok(from_object(&object)),
                None => failure = "expected a JSON object".to_string(),
            },
            Err(e) => failure = format!("invalid JSON: {}", e),
        }
    }

    Err(CullError::Parse(failure))
}

fn from_object(object: &Map<String, Value>) -> AnalysisResult {
    // Adjustments may be flat or nested under "adjustments"
    let nested = object.get("adjustments").and_then(Value::as_object);
    let slider = |key: &str, range: f64| -> f64 {
        let raw = object
            .get(key)
            .or_else(|| nested.and_then(|n| n.get(key)))
            .and_then(number);
        clamp_symmetric(raw.unwrap_or(0.0), range)
    };

    let temperature = object
        .get("temperature")
        .or_else(|| object.get("temp"))
        .or_else(|| nested.and_then(|n| n.get("temperature").or_else(|| n.get("temp"))))
        .and_then(number)
        .map(|t| clamp_symmetric(t, SLIDER_RANGE))
        .unwrap_or(0.0);

    AnalysisResult {
        rating: coerce_rating(object.get("rating")),
        adjustments: ToneAdjustments {
            exposure: slider("exposure", EXPOSURE_RANGE),
            contrast: slider("contrast", SLIDER_RANGE),
            highlights: slider("highlights", SLIDER_RANGE),
            shadows: slider("shadows", SLIDER_RANGE),
            whites: slider("whites", SLIDER_RANGE),
            blacks: slider("blacks", SLIDER_RANGE),
        },
        temperature,
        reason: text(object.get("reason")),
        caption: text(object.get("caption")),
        keywords: keywords(object.get("keywords")),
    }
}

/// Anything that isn't a usable number becomes 0
pub fn coerce_rating(value: Option<&Value>) -> u8 {
    match value.and_then(number) {
        Some(r) => r.round().clamp(0.0, MAX_RATING as f64) as u8,
        None => 0,
    }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Parse the number at the start of strings like "4", "+0.5", "4 stars", "-12%"
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    s[..end].parse().ok()
}

fn clamp_symmetric(v: f64, range: f64) -> f64 {
    v.clamp(-range, range)
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn keywords(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split([',', ';']).map(String::from).collect(),
        _ => Vec::new(),
    };

    let mut seen = Vec::<String>::new();
    let mut out = Vec::new();
    for keyword in raw {
        let keyword = keyword.trim().to_string();
        let folded = keyword.to_lowercase();
        if keyword.is_empty() || seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(keyword);
        if out.len() == MAX_KEYWORDS {
            break;
        }
    }
    out
}
