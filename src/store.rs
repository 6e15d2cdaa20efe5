//! `HostStore` and `SeoHook` backed by the local SQLite post store.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::db::{self, Pool};
use crate::host::{HostStore, SeoHook};
use crate::http::HttpFetch;
use crate::model::{AttachmentId, Category, NewPost, PostId};

pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct LocalStore {
    pool: Pool,
    http: Arc<dyn HttpFetch>,
    media_dir: PathBuf,
}

impl LocalStore {
    pub fn new(pool: Pool, http: Arc<dyn HttpFetch>, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            pool,
            http,
            media_dir: media_dir.into(),
        }
    }
}

/// Last path segment of an image URL, without query or fragment.
pub fn image_file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(name.to_string())
}

/// MIME type for the image extensions we accept; anything else is rejected.
pub fn image_content_type(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())?;
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[async_trait]
impl HostStore for LocalStore {
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        db::find_category_by_slug(&self.pool, slug).await
    }

    async fn create_category(&self, name: &str, slug: &str) -> Result<Category> {
        db::insert_category(&self.pool, name, slug)
            .await
            .with_context(|| format!("failed to create category {}", slug))
    }

    async fn post_exists(&self, slug: &str) -> Result<bool> {
        db::post_exists(&self.pool, slug).await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<PostId> {
        db::insert_post(&self.pool, post)
            .await
            .with_context(|| format!("failed to insert post {}", post.slug))
    }

    async fn update_post_content(&self, id: PostId, content: &str) -> Result<()> {
        db::update_post_content(&self.pool, id, content).await
    }

    async fn download_and_attach_image(&self, url: &str, post_id: PostId) -> Result<AttachmentId> {
        let file_name =
            image_file_name(url).ok_or_else(|| anyhow!("cannot derive file name from {}", url))?;
        let mime = image_content_type(&file_name)
            .ok_or_else(|| anyhow!("unsupported image type: {}", file_name))?;

        let bytes = self
            .http
            .get_bytes(url, IMAGE_TIMEOUT)
            .await
            .with_context(|| format!("download failed: {}", url))?;

        fs::create_dir_all(&self.media_dir)
            .await
            .with_context(|| format!("failed to create media dir: {}", self.media_dir.display()))?;
        let path = self
            .media_dir
            .join(format!("{}-{}", Uuid::new_v4().simple(), file_name));
        fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write image: {}", path.display()))?;

        let attachment_id = db::insert_attachment(
            &self.pool,
            post_id,
            url,
            &path.to_string_lossy(),
            mime,
        )
        .await?;
        info!(post_id, attachment_id, bytes = bytes.len(), "image attached");
        Ok(attachment_id)
    }

    async fn set_featured_image(&self, post_id: PostId, attachment_id: AttachmentId) -> Result<()> {
        db::set_featured_attachment(&self.pool, post_id, attachment_id).await
    }
}

#[async_trait]
impl SeoHook for LocalStore {
    async fn set_post_meta(&self, post_id: PostId, key: &str, value: &str) -> Result<()> {
        db::upsert_post_meta(&self.pool, post_id, key, value).await
    }

    async fn trigger_reindex(&self, post_id: PostId) -> Result<()> {
        db::enqueue_reindex(&self.pool, post_id).await
    }
}
