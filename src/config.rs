//! Configuration loader and validator for the WordPress sync pipeline.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::slug::sanitize_title;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Per-run configuration. Loaded once and passed explicitly to every stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    pub app: App,
    /// Base URLs of the remote WordPress REST APIs to mirror.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub images: Images,
    #[serde(default)]
    pub publish: Publish,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default)]
    pub debug: bool,
}

/// Text filters applied to every fetched post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Filters {
    #[serde(default)]
    pub remove_from_title: Vec<String>,
    #[serde(default)]
    pub remove_from_description: Vec<String>,
    #[serde(default)]
    pub replacement_pairs: Vec<ReplacementPair>,
    #[serde(default)]
    pub strip_links: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplacementPair {
    pub search: String,
    #[serde(default)]
    pub replace: String,
}

/// AI rewriting settings. `provider` is resolved to a `ProviderKind` at run time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub title_instruction: String,
    #[serde(default)]
    pub description_instruction: String,
}

/// Featured image import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Images {
    #[serde(default = "default_true")]
    pub fetch_featured: bool,
    /// When set, this image is attached to every synced post instead of the remote one.
    #[serde(default)]
    pub custom_featured_url: Option<String>,
}

impl Default for Images {
    fn default() -> Self {
        Self {
            fetch_featured: true,
            custom_featured_url: None,
        }
    }
}

/// Where and as whom synced posts are published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Publish {
    #[serde(default = "default_author_id")]
    pub author_id: i64,
    #[serde(default = "default_category_name")]
    pub category_name: String,
    #[serde(default = "default_category_slug")]
    pub category_slug: String,
    /// Public URL of this site; sent as the referer to OpenRouter.
    #[serde(default)]
    pub site_url: String,
}

impl Default for Publish {
    fn default() -> Self {
        Self {
            author_id: default_author_id(),
            category_name: default_category_name(),
            category_slug: default_category_slug(),
            site_url: String::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_author_id() -> i64 {
    1
}

fn default_category_name() -> String {
    "Latest Jobs".to_string()
}

fn default_category_slug() -> String {
    "latest-jobs".to_string()
}

impl SyncConfig {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(self.media_dir())
    }

    /// Data directory with a leading `~/` expanded to `$HOME`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        let raw = self.app.data_dir.trim();
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return Path::new(&home).join(rest);
            }
        }
        PathBuf::from(raw)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.resolved_data_dir().join("media")
    }

    /// Custom featured image override, ignoring blank values.
    pub fn custom_featured_url(&self) -> Option<&str> {
        self.images
            .custom_featured_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Parse and validate configuration from a YAML string.
pub fn parse(content: &str) -> Result<SyncConfig, ConfigError> {
    let cfg: SyncConfig = serde_yaml::from_str(content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
///
/// Missing sources or AI credentials are not errors: the run treats them as no-ops.
fn validate(cfg: &SyncConfig) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }

    if let Some(url) = cfg.custom_featured_url() {
        let lower = url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(ConfigError::Invalid(
                "images.custom_featured_url must be an http(s) URL",
            ));
        }
    }

    if cfg.publish.category_name.trim().is_empty() {
        return Err(ConfigError::Invalid("publish.category_name must be non-empty"));
    }
    if sanitize_title(&cfg.publish.category_slug).is_empty() {
        return Err(ConfigError::Invalid("publish.category_slug must be a usable slug"));
    }

    Ok(())
}

/// Example configuration covering every section.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  debug: false

sources:
  - "https://jobs.example.com/wp-json"
  - "https://careers.example.org"

filters:
  remove_from_title:
    - "[Hiring]"
  remove_from_description:
    - "Apply before it is too late!"
  replacement_pairs:
    - search: "Example Corp"
      replace: "Our Partner"
  strip_links: true

ai:
  enabled: false
  provider: "openai"
  api_key: "YOUR_API_KEY"
  model: ""
  title_instruction: "Rewrite the title to be concise and catchy."
  description_instruction: "Rewrite the description in a friendly tone."

images:
  fetch_featured: true
  custom_featured_url: null

publish:
  author_id: 1
  category_name: "Latest Jobs"
  category_slug: "latest-jobs"
  site_url: "https://my-site.example"
"#
}
