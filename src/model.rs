use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type PostId = i64;
pub type AttachmentId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostStatus {
    Publish,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "publish" => Some(PostStatus::Publish),
            _ => None,
        }
    }
}

/// `{"rendered": "..."}` wrapper used by the WordPress REST API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// A post record as returned by a remote `/wp/v2/posts` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemotePost {
    #[serde(default, deserialize_with = "lenient_slug")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "lenient_rendered")]
    pub title: Option<Rendered>,
    #[serde(default, deserialize_with = "lenient_rendered")]
    pub content: Option<Rendered>,
    #[serde(default)]
    pub featured_media: Option<Value>,
}

impl RemotePost {
    /// Any JSON value as a post. Non-objects become an empty record.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn title_html(&self) -> &str {
        self.title.as_ref().map(|t| t.rendered.as_str()).unwrap_or("")
    }

    pub fn content_html(&self) -> &str {
        self.content.as_ref().map(|c| c.rendered.as_str()).unwrap_or("")
    }

    /// Positive media id, accepting both numbers and numeric strings.
    pub fn featured_media_id(&self) -> Option<u64> {
        let id = match self.featured_media.as_ref()? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }?;
        (id > 0).then_some(id)
    }
}

/// String or numeric slug; anything else counts as missing.
fn lenient_slug<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `{"rendered": ..}` object or plain string; any other shape reads as empty.
fn lenient_rendered<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Rendered>, D::Error> {
    let rendered = match Option::<Value>::deserialize(de)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Object(map)) => map
            .get("rendered")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    Ok(rendered.map(|rendered| Rendered { rendered }))
}

/// Media record from `/wp/v2/media/{id}`; only the file URL matters here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteMedia {
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Insert payload handed to the host store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub author_id: i64,
    pub categories: Vec<i64>,
    pub slug: String,
}

/// Counters for a single sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub sources_visited: usize,
    pub posts_fetched: usize,
    pub duplicates_skipped: usize,
    pub published: usize,
    pub failed_inserts: usize,
    pub images_attached: usize,
}
