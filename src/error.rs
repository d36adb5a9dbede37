// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Error types for photocull

use thiserror::Error;

/// Result type alias for photocull operations
pub type Result<T> = std::result::Result<T, CullError>;

/// photocull error types
#[derive(Error, Debug)]
pub enum CullError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Rate limited by model API (status {0})")]
    RateLimited(u16),

    #[error("Model API server error (status {0})")]
    ServerError(u16),

    #[error("Model API returned status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    #[error("API credential missing: set ${0} or api.api_key in the config file")]
    MissingApiKey(String),

    #[error("Could not parse model reply: {0}")]
    Parse(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("No usable preview found in {0}")]
    NoPreview(String),

    #[error("Photo not found: {0}")]
    PhotoNotFound(String),

    #[error("Invalid rating {0}: expected 0-5")]
    InvalidRating(i64),
}

impl CullError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            CullError::RateLimited(_) | CullError::ServerError(_) => true,
            CullError::Api(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
