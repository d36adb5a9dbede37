// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for photocull

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::analysis::retry::RetryPolicy;
use crate::{CullError, Result};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    /// Hosted model settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Backoff for transient model failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Sequential queue settings
    #[serde(default)]
    pub queue: QueueConfig,

    /// Preview sanitization settings
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Prompt templates
    #[serde(default)]
    pub prompts: PromptConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the credential
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Credential stored in the config file (environment wins)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_true")]
    pub jitter: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct QueueConfig {
    /// Pause between photos, keeps us under the API rate limit
    #[serde(default = "default_queue_delay_ms")]
    pub delay_ms: u64,
    /// Photos rated at least this are selected automatically
    #[serde(default = "default_auto_select")]
    pub auto_select_min_rating: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PreviewConfig {
    #[serde(default = "default_max_edge")]
    pub max_edge: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_rating_prompt")]
    pub rating: String,
}

// Default value functions
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_model() -> String { "gemini-2.0-flash".to_string() }
fn default_api_key_env() -> String { "GEMINI_API_KEY".to_string() }
fn default_timeout() -> u64 { 60 }
fn default_temperature() -> f32 { 0.2 }
fn default_max_attempts() -> u32 { 4 }
fn default_base_delay_ms() -> u64 { 2000 }
fn default_max_delay_ms() -> u64 { 30_000 }
fn default_multiplier() -> f64 { 2.0 }
fn default_true() -> bool { true }
fn default_queue_delay_ms() -> u64 { 1500 }
fn default_auto_select() -> u8 { 3 }
fn default_max_edge() -> u32 { 1024 }
fn default_jpeg_quality() -> u8 { 85 }

fn default_rating_prompt() -> String {
    "You are an experienced photo editor culling a shoot. Rate this photo from 0 to 5 \
     for technical quality and aesthetic merit (focus, exposure, composition, moment). \
     Suggest Lightroom basic-panel adjustments that would improve it: exposure in stops \
     (-5 to 5), and contrast, highlights, shadows, whites, blacks and temperature as \
     offsets from -100 to 100. Give a one-sentence reason for the rating, a short caption \
     and up to eight keywords. Respond with JSON only."
        .to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: true,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_queue_delay_ms(),
            auto_select_min_rating: default_auto_select(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_edge: default_max_edge(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            rating: default_rating_prompt(),
        }
    }
}

impl ApiConfig {
    /// Resolve the credential, environment first
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var(&self.api_key_env) {
            if !key.trim().is_empty() {
                return Ok(key.trim().to_string());
            }
        }

        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .ok_or_else(|| CullError::MissingApiKey(self.api_key_env.clone()))
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| CullError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make the pipeline misbehave
    pub fn validate(&self) -> Result<()> {
        if self.preview.max_edge == 0 {
            return Err(CullError::Config("preview.max_edge must be positive".to_string()));
        }
        if !(1..=100).contains(&self.preview.jpeg_quality) {
            return Err(CullError::Config("preview.jpeg_quality must be 1-100".to_string()));
        }
        if self.queue.auto_select_min_rating > 5 {
            return Err(CullError::Config("queue.auto_select_min_rating must be 0-5".to_string()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(CullError::Config("retry.multiplier must be >= 1.0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"queue": {"delay_ms": 0}}"#).unwrap();
        assert_eq!(config.queue.delay_ms, 0);
        assert_eq!(config.queue.auto_select_min_rating, 3);
        assert_eq!(config.preview.max_edge, 1024);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.api.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.api.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.queue.delay_ms = 250;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.queue.delay_ms, 250);
    }

    #[test]
    fn test_invalid_quality_rejected() {
        let mut config = AppConfig::default();
        config.preview.jpeg_quality = 0;
        assert!(matches!(config.validate(), Err(CullError::Config(_))));
    }

    #[test]
    fn test_config_key_used_when_env_unset() {
        let api = ApiConfig {
            api_key_env: "PHOTOCULL_TEST_UNSET_KEY_VAR".to_string(),
            api_key: Some("  from-file ".to_string()),
            ..ApiConfig::default()
        };
        assert_eq!(api.resolve_api_key().unwrap(), "from-file");
    }

    #[test]
    fn test_missing_key_is_error() {
        let api = ApiConfig {
            api_key_env: "PHOTOCULL_TEST_UNSET_KEY_VAR".to_string(),
            api_key: None,
            ..ApiConfig::default()
        };
        assert!(matches!(api.resolve_api_key(), Err(CullError::MissingApiKey(_))));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryConfig::default().policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
    }
}
