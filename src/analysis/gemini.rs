// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Gemini API client for hosted vision inference

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::VisionModel;
use crate::config::ApiConfig;
use crate::{CullError, Result};

/// Longest error body we keep for messages
const MAX_ERROR_BODY: usize = 500;

/// Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    url: String,
    api_key: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a client for the configured endpoint and model
    pub fn new(config: &ApiConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let url = format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client,
            url,
            api_key,
            temperature: config.temperature,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(&self, prompt: &str, image_base64: &str) -> Result<String> {
        let request = build_request(prompt, image_base64, self.temperature);

        debug!("Sending vision request: {} ({} base64 bytes)", self.url, image_base64.len());

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: GenerateResponse = response.json().await?;
        reply_text(body)
    }
}

/// Fields the model is asked to return
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "rating": { "type": "INTEGER" },
            "exposure": { "type": "NUMBER" },
            "temperature": { "type": "NUMBER" },
            "highlights": { "type": "NUMBER" },
            "shadows": { "type": "NUMBER" },
            "whites": { "type": "NUMBER" },
            "blacks": { "type": "NUMBER" },
            "contrast": { "type": "NUMBER" },
            "reason": { "type": "STRING" },
            "keywords": { "type": "ARRAY", "items": { "type": "STRING" } },
            "caption": { "type": "STRING" }
        },
        "required": ["rating", "reason"]
    })
}

fn build_request(prompt: &str, image_base64: &str, temperature: f32) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text { text: prompt.to_string() },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: "image/jpeg".to_string(),
                        data: image_base64.to_string(),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            temperature,
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        },
    }
}

/// Map a non-success status onto an error the retry policy can classify
fn status_error(status: StatusCode, body: &str) -> CullError {
    let code = status.as_u16();
    if status == StatusCode::TOO_MANY_REQUESTS {
        CullError::RateLimited(code)
    } else if status.is_server_error() {
        CullError::ServerError(code)
    } else {
        CullError::ApiStatus {
            status: code,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        }
    }
}

fn reply_text(response: GenerateResponse) -> Result<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| CullError::Parse("empty response from model".to_string()))
}
