// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! photocull: AI-assisted photo culling
//!
//! Pulls embedded previews out of RAW and JPEG camera files, rates them with a
//! hosted vision model and exports the verdicts as Lightroom XMP sidecars.

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod pipeline;
pub mod preview;
pub mod project;
pub mod scanner;

pub use config::AppConfig;
pub use error::{CullError, Result};
