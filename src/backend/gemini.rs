//! Gemini text generation over the Generative Language REST API

use super::models::ModelRegistry;
use super::{preview, TextGenerator};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Header carrying the API key, which keeps it out of request URLs
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini backend
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    models: Arc<ModelRegistry>,
}

impl GeminiBackend {
    /// Create a backend with an explicit API key
    pub fn new(config: &BackendConfig, api_key: String, models: Arc<ModelRegistry>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            models,
        }
    }

    /// Create a backend, resolving the API key from the environment
    pub fn from_config(config: &BackendConfig, models: Arc<ModelRegistry>) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Ok(Self::new(config, api_key, models))
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl TextGenerator for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let model = self.models.current_model().await;
        tracing::info!("Gemini prompt preview: {}", preview(prompt, 45));

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint(&model))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::Backend(format!("Gemini request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API error ({}): {}", status, body);
            return Err(Error::Backend(format!("Gemini API returned {}", status)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                Error::Backend(format!("Failed to parse Gemini response: {}", e.without_url()))
            })?;

        let text = parsed
            .reply_text()
            .ok_or_else(|| Error::Backend("Gemini response had no candidates".to_string()))?;

        tracing::info!("Gemini response generated with model: {}", model);
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn reply_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        Some(content.parts.iter().map(|p| p.text.as_str()).collect())
    }
}
