// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Photo analysis through a hosted vision model
//!
//! `Analyzer::analyze` never returns an error: every failure mode ends up as
//! `AnalysisOutcome::Failed`, so a zero-star verdict can't be mistaken for a
//! broken request.

pub mod gemini;
pub mod parse;
pub mod retry;
pub mod types;

use async_trait::async_trait;
use tracing::{info, warn};

pub use gemini::GeminiClient;
pub use retry::{RetryError, RetryPolicy};
pub use types::{AnalysisOutcome, AnalysisResult, ToneAdjustments, MAX_RATING};

use crate::config::AppConfig;
use crate::{CullError, Result};

/// A multimodal model that answers a prompt about one image
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Return the raw text reply
    async fn generate(&self, prompt: &str, image_base64: &str) -> Result<String>;
}

/// Rates previews with a vision model under a retry policy
pub struct Analyzer {
    model: Box<dyn VisionModel>,
    policy: RetryPolicy,
    prompt: String,
}

impl Analyzer {
    pub fn new(model: Box<dyn VisionModel>, policy: RetryPolicy, prompt: impl Into<String>) -> Self {
        Self {
            model,
            policy,
            prompt: prompt.into(),
        }
    }

    /// Build a Gemini-backed analyzer; fails when no credential is available
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.api.resolve_api_key()?;
        let client = GeminiClient::new(&config.api, api_key)?;
        info!("Using model {} at {}", config.api.model, client.url());
        Ok(Self::new(Box::new(client), config.retry.policy(), config.prompts.rating.clone()))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Rate one sanitized preview
    pub async fn analyze(&self, image_base64: &str) -> AnalysisOutcome {
        let mut attempts = 0;
        let reply = self
            .policy
            .run(
                |attempt| {
                    attempts = attempt;
                    self.model.generate(&self.prompt, image_base64)
                },
                CullError::is_transient,
            )
            .await;

        match reply {
            Ok(text) => match parse::parse_reply(&text) {
                Ok(result) => AnalysisOutcome::Rated(result),
                Err(e) => {
                    warn!("Unusable model reply after {} attempt(s): {}", attempts, e);
                    AnalysisOutcome::Failed { reason: e.to_string(), attempts }
                }
            },
            Err(RetryError { error, attempts }) => {
                warn!("Analysis failed after {} attempt(s): {}", attempts, error);
                AnalysisOutcome::Failed { reason: error.to_string(), attempts }
            }
        }
    }
}
