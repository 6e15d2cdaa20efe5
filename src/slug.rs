//! Slug derivation used for dedup and for the persisted post name.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::model::RemotePost;
use crate::transform::strip_tags;

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#?[a-zA-Z0-9]+;").expect("valid entity regex"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s./_]+").expect("valid separator regex"));
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid hyphen regex"));

const FALLBACK_PREFIX: &str = "aspom-";

/// WordPress-style `sanitize_title`: lowercase, hyphen-separated, alphanumerics
/// and percent-encoded octets only.
pub fn sanitize_title(input: &str) -> String {
    let text = strip_tags(input);
    let text = ENTITY.replace_all(&text, "").to_lowercase();
    let text = SEPARATORS.replace_all(&text, "-");
    let chars: Vec<char> = text.chars().collect();
    let mut kept = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_alphanumeric() || c == '-' {
            kept.push(c);
        } else if c == '%'
            && i + 2 < chars.len()
            && chars[i + 1].is_ascii_hexdigit()
            && chars[i + 2].is_ascii_hexdigit()
        {
            kept.extend(&chars[i..i + 3]);
            i += 3;
            continue;
        }
        i += 1;
    }
    HYPHENS
        .replace_all(&kept, "-")
        .trim_matches('-')
        .to_string()
}

/// Random slug for posts with neither a slug nor a title.
pub fn fallback_slug() -> String {
    format!("{}{}", FALLBACK_PREFIX, Uuid::new_v4().simple())
}

/// Slug checked for duplicates and persisted with the post.
///
/// Remote slug first, then the title, then a random fallback, so two untitled
/// posts never collapse into one.
pub fn candidate_slug(post: &RemotePost) -> String {
    let from_slug = post.slug.as_deref().map(sanitize_title).unwrap_or_default();
    if !from_slug.is_empty() {
        return from_slug;
    }
    let from_title = sanitize_title(post.title_html());
    if !from_title.is_empty() {
        return from_title;
    }
    fallback_slug()
}
