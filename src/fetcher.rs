//! Remote post discovery with REST endpoint fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::http::HttpFetch;
use crate::model::{RemoteMedia, RemotePost};

pub const SOURCE_TIMEOUT: Duration = Duration::from_secs(20);
pub const MEDIA_TIMEOUT: Duration = Duration::from_secs(15);

/// Tried in this order; the first one answering with a JSON array wins.
const ENDPOINT_SUFFIXES: [&str; 3] = [
    "/posts?per_page=10",
    "/wp/v2/posts?per_page=10",
    "/wp-json/wp/v2/posts?per_page=10",
];

static INLINE_IMG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("valid img regex")
});

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0:#}")]
    Transport(anyhow::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is not a JSON array")]
    NotAnArray,
}

/// Trim whitespace and trailing slashes from a source base URL.
pub fn normalize_base(base_url: &str) -> &str {
    base_url.trim().trim_end_matches('/')
}

pub fn candidate_endpoints(base_url: &str) -> Vec<String> {
    let base = normalize_base(base_url);
    ENDPOINT_SUFFIXES
        .iter()
        .map(|suffix| format!("{}{}", base, suffix))
        .collect()
}

/// Fetch up to ten posts from a source, trying each candidate endpoint in turn.
///
/// Failures are logged per candidate; if none answers with an array the result is empty.
#[instrument(skip(http))]
pub async fn fetch_posts(http: &dyn HttpFetch, base_url: &str) -> Vec<RemotePost> {
    for url in candidate_endpoints(base_url) {
        match try_endpoint(http, &url).await {
            Ok(posts) => {
                debug!(%url, count = posts.len(), "source endpoint accepted");
                return posts;
            }
            Err(err) => warn!(%url, error = %err, "fetch failed"),
        }
    }
    warn!(source = base_url, "no endpoint returned a post list");
    Vec::new()
}

async fn try_endpoint(http: &dyn HttpFetch, url: &str) -> Result<Vec<RemotePost>, FetchError> {
    let body = http
        .get_text(url, SOURCE_TIMEOUT)
        .await
        .map_err(FetchError::Transport)?;
    parse_posts(&body)
}

/// Parse a response body into posts. Any JSON array is accepted, even an empty one,
/// and every element becomes a post; fields of an unexpected shape read as empty.
pub fn parse_posts(body: &str) -> Result<Vec<RemotePost>, FetchError> {
    let Value::Array(items) = serde_json::from_str::<Value>(body)? else {
        return Err(FetchError::NotAnArray);
    };
    Ok(items.into_iter().map(RemotePost::from_value).collect())
}

/// Resolve a featured media id to its file URL via `{source}/wp/v2/media/{id}`.
#[instrument(skip(http))]
pub async fn fetch_media_url(http: &dyn HttpFetch, source: &str, media_id: u64) -> Option<String> {
    let url = format!("{}/wp/v2/media/{}", normalize_base(source), media_id);
    let body = match http.get_text(&url, MEDIA_TIMEOUT).await {
        Ok(body) => body,
        Err(err) => {
            warn!(%url, error = %format!("{err:#}"), "media lookup failed");
            return None;
        }
    };
    match serde_json::from_str::<RemoteMedia>(&body) {
        Ok(media) => media.source_url.filter(|u| !u.trim().is_empty()),
        Err(err) => {
            warn!(%url, error = %err, "media response had unexpected format");
            None
        }
    }
}

/// First `<img src>` found in rendered HTML.
pub fn first_inline_image(html: &str) -> Option<String> {
    INLINE_IMG
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
