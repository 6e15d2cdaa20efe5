//! Narrow interfaces to the content store the pipeline publishes into.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{AttachmentId, Category, NewPost, PostId};

/// Post, term and media persistence.
#[async_trait]
pub trait HostStore: Send + Sync {
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    async fn create_category(&self, name: &str, slug: &str) -> Result<Category>;

    /// Exact slug match against existing posts.
    async fn post_exists(&self, slug: &str) -> Result<bool>;

    async fn insert_post(&self, post: &NewPost) -> Result<PostId>;

    async fn update_post_content(&self, id: PostId, content: &str) -> Result<()>;

    /// Download `url` and store it as an attachment of `post_id`.
    async fn download_and_attach_image(&self, url: &str, post_id: PostId) -> Result<AttachmentId>;

    async fn set_featured_image(&self, post_id: PostId, attachment_id: AttachmentId) -> Result<()>;
}

/// Optional SEO integration, only called when present.
#[async_trait]
pub trait SeoHook: Send + Sync {
    async fn set_post_meta(&self, post_id: PostId, key: &str, value: &str) -> Result<()>;

    async fn trigger_reindex(&self, post_id: PostId) -> Result<()>;
}
