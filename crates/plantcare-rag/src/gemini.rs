//! Gemini `generateContent` client.
//!
//! Blocking HTTP with a bounded timeout; a timeout is reported as
//! `ModelError::Timeout`. No retries.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use plantcare_core::config::ModelSettings;
use plantcare_core::{Error, Result};

use crate::model::{GenerationModel, ModelError};

/// Longest error body kept in `ModelError::Status`.
const MAX_ERROR_BODY: usize = 512;

pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Build from settings, reading the key from the environment variable
    /// named by `api_key_env`. A missing or blank key is a `Config` error.
    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config(format!("{} environment variable not set", settings.api_key_env)))?;
        Self::new(settings, api_key)
    }

    pub fn new(settings: &ModelSettings, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.name.clone(),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl GenerationModel for GeminiClient {
    fn name(&self) -> &str { &self.model }

    fn generate(&self, prompt: &str) -> std::result::Result<String, ModelError> {
        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "calling Gemini");
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(prompt))
            .send()
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            return Err(ModelError::Status { status: status.as_u16(), body: truncate(&body, MAX_ERROR_BODY) });
        }
        parse_response(&body)
    }
}

fn transport_error(e: reqwest::Error) -> ModelError {
    if e.is_timeout() { ModelError::Timeout } else { ModelError::Http(e.to_string()) }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}

pub(crate) fn request_body(prompt: &str) -> serde_json::Value {
    json!({ "contents": [{ "role": "user", "parts": [{ "text": prompt }] }] })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Text of the first candidate, all parts concatenated.
pub(crate) fn parse_response(body: &str) -> std::result::Result<String, ModelError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| ModelError::Decode(e.to_string()))?;
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ModelError::Blocked(reason));
    }
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() { Err(ModelError::Empty) } else { Ok(text) }
}
