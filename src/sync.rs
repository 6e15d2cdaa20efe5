//! The sync run: fetch every source, skip known slugs, rewrite and publish the rest.
//!
//! Everything runs sequentially. No failure inside the loop aborts the run;
//! each one is logged and the affected source, post or step is skipped.

use tracing::{debug, info, instrument, warn};

use crate::ai::{AiEnhancer, EnhancementRequest};
use crate::config::SyncConfig;
use crate::fetcher::{fetch_media_url, fetch_posts, first_inline_image};
use crate::host::{HostStore, SeoHook};
use crate::http::HttpFetch;
use crate::model::{NewPost, PostId, PostStatus, RemotePost, SyncReport};
use crate::slug::{candidate_slug, sanitize_title};
use crate::transform::{strip_scripts, strip_tags, transform};

pub const FOCUS_KEYWORD_META: &str = "rank_math_focus_keyword";

/// Promotional block appended to every synced post.
pub const CTA_HTML: &str = r##"<div style="text-align:center;margin-top:20px;"><a href="#" style="background:#0073aa;color:#fff;padding:10px 18px;border-radius:4px;text-decoration:none;">Latest Job vacancy</a></div>"##;

pub struct SyncOrchestrator<'a> {
    config: &'a SyncConfig,
    http: &'a dyn HttpFetch,
    host: &'a dyn HostStore,
    enhancer: &'a AiEnhancer,
    seo: Option<&'a dyn SeoHook>,
}

struct Published {
    post_id: PostId,
    image_attached: bool,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        config: &'a SyncConfig,
        http: &'a dyn HttpFetch,
        host: &'a dyn HostStore,
        enhancer: &'a AiEnhancer,
    ) -> Self {
        Self {
            config,
            http,
            host,
            enhancer,
            seo: None,
        }
    }

    pub fn with_seo(mut self, seo: &'a dyn SeoHook) -> Self {
        self.seo = Some(seo);
        self
    }

    /// Run one full sync over all configured sources.
    #[instrument(skip(self))]
    pub async fn run_sync(&self, is_manual: bool) -> SyncReport {
        let mut report = SyncReport::default();
        let category_id = self.resolve_category().await;

        if self.config.sources.is_empty() {
            info!("No sources configured");
            return report;
        }

        for source in &self.config.sources {
            let source = source.trim();
            if source.is_empty() {
                continue;
            }
            report.sources_visited += 1;

            let posts = fetch_posts(self.http, source).await;
            report.posts_fetched += posts.len();

            for post in &posts {
                let slug = candidate_slug(post);
                match self.host.post_exists(&slug).await {
                    Ok(true) => {
                        debug!(%slug, "post already exists; skipping");
                        report.duplicates_skipped += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!(%slug, error = %format!("{err:#}"), "existence check failed; skipping post");
                        continue;
                    }
                }

                match self.publish_post(post, source, &slug, category_id).await {
                    Some(published) => {
                        report.published += 1;
                        if published.image_attached {
                            report.images_attached += 1;
                        }
                        info!(post_id = published.post_id, source, "Inserted post");
                    }
                    None => report.failed_inserts += 1,
                }
            }
        }

        info!(
            manual = is_manual,
            sources = report.sources_visited,
            fetched = report.posts_fetched,
            duplicates = report.duplicates_skipped,
            published = report.published,
            failed = report.failed_inserts,
            images = report.images_attached,
            "sync run finished"
        );
        report
    }

    /// Find or create the destination category. Failure leaves posts uncategorized.
    async fn resolve_category(&self) -> Option<i64> {
        let name = self.config.publish.category_name.trim();
        let slug = sanitize_title(&self.config.publish.category_slug);
        match self.host.find_category_by_slug(&slug).await {
            Ok(Some(category)) => Some(category.id),
            Ok(None) => match self.host.create_category(name, &slug).await {
                Ok(category) => Some(category.id),
                Err(err) => {
                    warn!(%slug, error = %format!("{err:#}"), "could not create category");
                    None
                }
            },
            Err(err) => {
                warn!(%slug, error = %format!("{err:#}"), "category lookup failed");
                None
            }
        }
    }

    /// Transform, enhance and persist one post, then run its follow-up steps.
    /// Returns `None` when the insert is rejected; nothing else happens in that case.
    async fn publish_post(
        &self,
        post: &RemotePost,
        source: &str,
        slug: &str,
        category_id: Option<i64>,
    ) -> Option<Published> {
        let transformed = transform(post.title_html(), post.content_html(), &self.config.filters);
        let mut title = transformed.title;
        let mut content = transformed.content;

        if self.enhancer.is_configured() {
            let request = EnhancementRequest::new(&self.config.ai, &title, &strip_tags(&content));
            if let Some(enhanced) = self.enhancer.enhance(&request).await {
                let new_title = strip_tags(&enhanced.title);
                if !new_title.is_empty() {
                    title = new_title;
                }
                if !enhanced.description.trim().is_empty() {
                    content = strip_scripts(&enhanced.description);
                }
            }
        }

        let new_post = NewPost {
            title: title.clone(),
            content: content.clone(),
            status: PostStatus::Publish,
            author_id: self.config.publish.author_id,
            categories: category_id.into_iter().collect(),
            slug: slug.to_string(),
        };
        let post_id = match self.host.insert_post(&new_post).await {
            Ok(id) => id,
            Err(err) => {
                warn!(slug, source, error = %format!("{err:#}"), "Failed insert");
                return None;
            }
        };

        let image_attached = if self.config.images.fetch_featured {
            self.attach_featured_image(post, source, post_id).await
        } else {
            false
        };

        let with_cta = format!("{}{}", content, CTA_HTML);
        if let Err(err) = self.host.update_post_content(post_id, &with_cta).await {
            warn!(post_id, error = %format!("{err:#}"), "failed to append call-to-action");
        }

        if let Some(seo) = self.seo {
            self.tag_focus_keyword(seo, post_id, &title).await;
        }

        Some(Published {
            post_id,
            image_attached,
        })
    }

    /// Custom override URL first, otherwise the remote post's own image.
    async fn attach_featured_image(&self, post: &RemotePost, source: &str, post_id: PostId) -> bool {
        let image_url = match self.config.custom_featured_url() {
            Some(url) => Some(url.to_string()),
            None => self.discover_image(post, source).await,
        };
        let Some(image_url) = image_url else {
            debug!(post_id, "no featured image found");
            return false;
        };

        let attachment_id = match self.host.download_and_attach_image(&image_url, post_id).await {
            Ok(id) => id,
            Err(err) => {
                warn!(post_id, url = %image_url, error = %format!("{err:#}"), "image import failed");
                return false;
            }
        };
        match self.host.set_featured_image(post_id, attachment_id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(post_id, attachment_id, error = %format!("{err:#}"), "could not set featured image");
                false
            }
        }
    }

    /// Featured media from the source's media endpoint, then the first inline image.
    async fn discover_image(&self, post: &RemotePost, source: &str) -> Option<String> {
        if let Some(media_id) = post.featured_media_id() {
            if let Some(url) = fetch_media_url(self.http, source, media_id).await {
                return Some(url);
            }
        }
        first_inline_image(post.content_html())
    }

    async fn tag_focus_keyword(&self, seo: &dyn SeoHook, post_id: PostId, title: &str) {
        let keyword = focus_keyword(title);
        if keyword.is_empty() {
            return;
        }
        if let Err(err) = seo.set_post_meta(post_id, FOCUS_KEYWORD_META, &keyword).await {
            warn!(post_id, error = %format!("{err:#}"), "failed to write focus keyword");
            return;
        }
        if let Err(err) = seo.trigger_reindex(post_id).await {
            warn!(post_id, error = %format!("{err:#}"), "SEO reindex failed");
        }
    }
}

/// "first, last" for titles with two or more words, otherwise the title itself.
pub fn focus_keyword(title: &str) -> String {
    let words: Vec<&str> = title.split_whitespace().collect();
    match words.as_slice() {
        [first, .., last] => format!("{}, {}", first, last),
        _ => title.trim().to_string(),
    }
}
