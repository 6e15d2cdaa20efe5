//! AI rewriting of post title and description.
//!
//! [`AiEnhancer`] builds a single prompt from the configured instructions and
//! the original text, then hands it to exactly one vendor adapter picked from
//! the closed [`ProviderKind`] set. Every failure degrades to `None` so the
//! caller keeps the unenhanced text.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AiSettings;

pub mod gemini;
pub mod openai;
pub mod openrouter;

pub const AI_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_OUTPUT_TOKENS: u32 = 800;
pub const TEMPERATURE: f64 = 0.7;
pub const SYSTEM_PROMPT: &str =
    "You are a content enhancement assistant. Improve the provided content based on the instructions.";
const CLOSING_LINE: &str = "Please provide the enhanced content.";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{vendor} request could not be built: {source}")]
    Build {
        vendor: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{vendor} API error: {source}")]
    Transport {
        vendor: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{vendor} API returned status {status}: {message}")]
    Status {
        vendor: &'static str,
        status: u16,
        message: String,
    },
    #[error("{vendor} API returned unexpected response format")]
    UnexpectedFormat { vendor: &'static str },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown AI provider: {0}")]
pub struct UnknownProvider(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Display name used in log lines and errors.
    pub fn vendor(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::Gemini => "Gemini",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// One vendor adapter: prompt in, generated text out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

/// Registry: every `ProviderKind` maps to exactly one adapter.
pub fn build_provider(
    kind: ProviderKind,
    http: Client,
    api_key: &str,
    model: &str,
    site_url: &str,
) -> Box<dyn CompletionProvider> {
    match kind {
        ProviderKind::OpenAi => Box::new(openai::OpenAiClient::new(http, api_key, model)),
        ProviderKind::OpenRouter => Box::new(openrouter::OpenRouterClient::new(
            http, api_key, model, site_url,
        )),
        ProviderKind::Gemini => Box::new(gemini::GeminiClient::new(http, api_key, model)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancementRequest {
    pub title_instruction: String,
    pub description_instruction: String,
    pub original_title: String,
    pub original_description: String,
}

impl EnhancementRequest {
    /// Description is cut to [`MAX_DESCRIPTION_CHARS`] characters.
    pub fn new(settings: &AiSettings, title: &str, description: &str) -> Self {
        Self {
            title_instruction: settings.title_instruction.clone(),
            description_instruction: settings.description_instruction.clone(),
            original_title: title.to_string(),
            original_description: description.chars().take(MAX_DESCRIPTION_CHARS).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enhancement {
    pub title: String,
    pub description: String,
}

/// Assemble the prompt, or `None` when there is no instruction to give.
pub fn build_prompt(req: &EnhancementRequest) -> Option<String> {
    let mut parts = Vec::with_capacity(5);
    if !req.title_instruction.trim().is_empty() {
        parts.push(format!("Title Enhancement: {}", req.title_instruction));
    }
    if !req.description_instruction.trim().is_empty() {
        parts.push(format!("Description Enhancement: {}", req.description_instruction));
    }
    if parts.is_empty() {
        return None;
    }
    let description: String = req
        .original_description
        .chars()
        .take(MAX_DESCRIPTION_CHARS)
        .collect();
    parts.push(format!("Original Title: {}", req.original_title));
    parts.push(format!("Original Description: {}", description));
    parts.push(CLOSING_LINE.to_string());
    Some(parts.join("\n\n"))
}

enum Backend {
    Unconfigured,
    Unknown(String),
    Ready(Box<dyn CompletionProvider>),
}

pub struct AiEnhancer {
    backend: Backend,
}

impl AiEnhancer {
    /// Resolve the configured provider. Disabled or credential-less settings
    /// produce an enhancer that always answers `None`.
    pub fn from_settings(settings: &AiSettings, http: Client, site_url: &str) -> Self {
        if !settings.enabled
            || settings.provider.trim().is_empty()
            || settings.api_key.trim().is_empty()
        {
            return Self::disabled();
        }
        let backend = match settings.provider.parse::<ProviderKind>() {
            Ok(kind) => Backend::Ready(build_provider(
                kind,
                http,
                settings.api_key.trim(),
                settings.model.trim(),
                site_url,
            )),
            Err(UnknownProvider(name)) => Backend::Unknown(name),
        };
        Self { backend }
    }

    pub fn with_provider(provider: Box<dyn CompletionProvider>) -> Self {
        Self {
            backend: Backend::Ready(provider),
        }
    }

    pub fn disabled() -> Self {
        Self {
            backend: Backend::Unconfigured,
        }
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self.backend, Backend::Unconfigured)
    }

    /// Ask the provider to rewrite the post. The same generated text is
    /// returned as both title and description.
    pub async fn enhance(&self, req: &EnhancementRequest) -> Option<Enhancement> {
        let provider = match &self.backend {
            Backend::Unconfigured => {
                debug!("AI generation skipped: provider or API key not configured");
                return None;
            }
            Backend::Unknown(name) => {
                warn!(provider = %name, "unknown AI provider");
                return None;
            }
            Backend::Ready(provider) => provider,
        };
        let Some(prompt) = build_prompt(req) else {
            debug!("AI generation skipped: no instructions provided");
            return None;
        };

        match provider.complete(&prompt).await {
            Ok(text) if !text.is_empty() => {
                info!(provider = provider.kind().as_str(), "AI enhancement succeeded");
                Some(Enhancement {
                    title: text.clone(),
                    description: text,
                })
            }
            Ok(_) => {
                warn!(provider = provider.kind().as_str(), "AI returned empty text");
                None
            }
            Err(err) => {
                warn!(provider = provider.kind().as_str(), error = %err, "AI enhancement failed");
                None
            }
        }
    }
}

/// Execute a vendor request and return its JSON body on HTTP 200.
pub(crate) async fn send_json(
    http: &Client,
    request: reqwest::Request,
    vendor: &'static str,
) -> Result<Value, AiError> {
    debug!(vendor, url = %redact_query(request.url()), "calling AI API");
    let res = http
        .execute(request)
        .await
        .map_err(|source| AiError::Transport { vendor, source })?;
    let status = res.status();
    let body: Value = match res.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    };
    if status != StatusCode::OK {
        let message = body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        return Err(AiError::Status {
            vendor,
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

/// Trimmed, non-empty string at a JSON pointer.
pub(crate) fn text_at(body: &Value, pointer: &str) -> Option<String> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn redact_query(url: &reqwest::Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}
