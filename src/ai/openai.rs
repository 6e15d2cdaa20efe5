use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{
    send_json, text_at, AiError, CompletionProvider, ProviderKind, AI_TIMEOUT, MAX_OUTPUT_TOKENS,
    SYSTEM_PROMPT, TEMPERATURE,
};

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const VENDOR: &str = "OpenAI";

#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(http: Client, api_key: &str, model: &str) -> Self {
        Self::with_endpoint(http, OPENAI_ENDPOINT, api_key, model)
    }

    pub fn with_endpoint(http: Client, endpoint: &str, api_key: &str, model: &str) -> Self {
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };
        Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn build_request(&self, prompt: &str) -> Result<reqwest::Request, AiError> {
        self.http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .timeout(AI_TIMEOUT)
            .json(&chat_body(&self.model, prompt))
            .build()
            .map_err(|source| AiError::Build {
                vendor: VENDOR,
                source,
            })
    }
}

/// Chat-completions body shared by OpenAI and OpenRouter.
pub fn chat_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": prompt }
        ],
        "max_tokens": MAX_OUTPUT_TOKENS,
        "temperature": TEMPERATURE,
    })
}

/// Generated text at `choices[0].message.content`.
pub fn extract_chat_text(body: &Value) -> Option<String> {
    text_at(body, "/choices/0/message/content")
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = self.build_request(prompt)?;
        let body = send_json(&self.http, request, VENDOR).await?;
        extract_chat_text(&body).ok_or(AiError::UnexpectedFormat { vendor: VENDOR })
    }
}
