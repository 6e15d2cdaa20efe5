use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{
    send_json, text_at, AiError, CompletionProvider, ProviderKind, AI_TIMEOUT, MAX_OUTPUT_TOKENS,
    TEMPERATURE,
};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-pro";
const VENDOR: &str = "Gemini";

/// Gemini-style `generateContent` adapter. The key travels in the query string.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(http: Client, api_key: &str, model: &str) -> Self {
        Self::with_base_url(http, GEMINI_API_BASE, api_key, model)
    }

    pub fn with_base_url(http: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub fn build_request(&self, prompt: &str) -> Result<reqwest::Request, AiError> {
        self.http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .timeout(AI_TIMEOUT)
            .json(&generate_body(prompt))
            .build()
            .map_err(|source| AiError::Build {
                vendor: VENDOR,
                source,
            })
    }
}

pub fn generate_body(prompt: &str) -> Value {
    json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ],
        "generationConfig": {
            "temperature": TEMPERATURE,
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
            "topP": 0.8,
            "topK": 40
        }
    })
}

/// Generated text at `candidates[0].content.parts[0].text`.
pub fn extract_text(body: &Value) -> Option<String> {
    text_at(body, "/candidates/0/content/parts/0/text")
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = self.build_request(prompt)?;
        let body = send_json(&self.http, request, VENDOR).await?;
        extract_text(&body).ok_or(AiError::UnexpectedFormat { vendor: VENDOR })
    }
}
