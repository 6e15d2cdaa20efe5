//! String filters applied to fetched posts before they are published.
//!
//! The order is fixed: title removals, description removals, replacement pairs
//! (both fields), then link stripping. A removal can change what a later pair
//! matches, so the steps must not be reordered.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::config::Filters;

static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("valid script/style regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a\s*>").expect("valid anchor regex"));
static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s"']+"#).expect("valid url regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub title: String,
    pub content: String,
}

/// Run the filter chain over a rendered title and content.
///
/// The title comes back tag-stripped and trimmed; the content keeps its HTML.
pub fn transform(title_html: &str, content_html: &str, filters: &Filters) -> Transformed {
    let mut title = strip_tags(title_html);
    let mut content = content_html.to_string();

    for needle in &filters.remove_from_title {
        title = remove_case_insensitive(&title, needle);
    }
    for needle in &filters.remove_from_description {
        content = remove_case_insensitive(&content, needle);
    }

    for pair in &filters.replacement_pairs {
        if pair.search.is_empty() {
            continue;
        }
        content = content.replace(&pair.search, &pair.replace);
        title = title.replace(&pair.search, &pair.replace);
    }

    if filters.strip_links {
        content = strip_links(&content);
    }

    Transformed {
        title: strip_tags(&title),
        content,
    }
}

/// Remove every case-insensitive occurrence of `needle`. Empty needles are ignored.
pub fn remove_case_insensitive(haystack: &str, needle: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.replace_all(haystack, "").into_owned(),
        Err(_) => haystack.replace(needle, ""),
    }
}

/// Replace anchors with their inner text, then drop any bare http(s) URL left over.
pub fn strip_links(html: &str) -> String {
    let unlinked = ANCHOR.replace_all(html, "$1");
    BARE_URL.replace_all(&unlinked, "").into_owned()
}

/// Remove script/style blocks and every tag, then trim.
pub fn strip_tags(html: &str) -> String {
    let without_blocks = SCRIPT_STYLE.replace_all(html, "");
    TAG.replace_all(&without_blocks, "").trim().to_string()
}

/// Remove script/style blocks but keep the remaining markup.
pub fn strip_scripts(html: &str) -> String {
    SCRIPT_STYLE.replace_all(html, "").into_owned()
}
