//! Row models returned by the post store repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use chrono::NaiveDateTime;

use crate::model::PostStatus;

/// A persisted post with its category ids.
#[derive(Debug, Clone)]
pub struct StoredPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub author_id: i64,
    pub slug: String,
    pub featured_attachment_id: Option<i64>,
    pub categories: Vec<i64>,
    pub created_at: NaiveDateTime,
}

/// A downloaded image tied to a post.
#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub id: i64,
    pub post_id: i64,
    pub source_url: String,
    pub file_path: String,
    pub mime_type: String,
}
