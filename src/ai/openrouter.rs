use async_trait::async_trait;
use reqwest::Client;

use super::openai::{chat_body, extract_chat_text};
use super::{send_json, AiError, CompletionProvider, ProviderKind, AI_TIMEOUT};

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";
pub const APP_TITLE: &str = "Auto Sync Pro";
const VENDOR: &str = "OpenRouter";

#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    referer: String,
}

impl OpenRouterClient {
    pub fn new(http: Client, api_key: &str, model: &str, referer: &str) -> Self {
        Self::with_endpoint(http, OPENROUTER_ENDPOINT, api_key, model, referer)
    }

    pub fn with_endpoint(
        http: Client,
        endpoint: &str,
        api_key: &str,
        model: &str,
        referer: &str,
    ) -> Self {
        let model = if model.is_empty() { DEFAULT_MODEL } else { model };
        Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            referer: referer.to_string(),
        }
    }

    pub fn build_request(&self, prompt: &str) -> Result<reqwest::Request, AiError> {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", APP_TITLE)
            .timeout(AI_TIMEOUT);
        if !self.referer.is_empty() {
            builder = builder.header("HTTP-Referer", &self.referer);
        }
        builder
            .json(&chat_body(&self.model, prompt))
            .build()
            .map_err(|source| AiError::Build {
                vendor: VENDOR,
                source,
            })
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = self.build_request(prompt)?;
        let body = send_json(&self.http, request, VENDOR).await?;
        extract_chat_text(&body).ok_or(AiError::UnexpectedFormat { vendor: VENDOR })
    }
}
