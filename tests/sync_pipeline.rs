use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use wp_autosync::ai::{AiEnhancer, AiError, CompletionProvider, ProviderKind};
use wp_autosync::config::{self, ReplacementPair, SyncConfig};
use wp_autosync::fetcher::fetch_posts;
use wp_autosync::host::{HostStore, SeoHook};
use wp_autosync::http::HttpFetch;
use wp_autosync::model::{AttachmentId, Category, NewPost, PostId, PostStatus};
use wp_autosync::sync::{SyncOrchestrator, CTA_HTML, FOCUS_KEYWORD_META};

const SOURCE: &str = "https://src.example/wp-json/";
const EP1: &str = "https://src.example/wp-json/posts?per_page=10";
const EP2: &str = "https://src.example/wp-json/wp/v2/posts?per_page=10";
const EP3: &str = "https://src.example/wp-json/wp-json/wp/v2/posts?per_page=10";

#[derive(Clone, Default)]
struct FakeHttp {
    responses: Arc<Mutex<HashMap<String, String>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl FakeHttp {
    fn with(responses: &[(&str, &str)]) -> Self {
        let map = responses
            .iter()
            .map(|(u, b)| (u.to_string(), b.to_string()))
            .collect();
        Self {
            responses: Arc::new(Mutex::new(map)),
            ..Default::default()
        }
    }

    async fn requested(&self) -> Vec<String> {
        self.requested.lock().await.clone()
    }
}

#[async_trait]
impl HttpFetch for FakeHttp {
    async fn get_text(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.requested.lock().await.push(url.to_string());
        self.responses
            .lock()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {}", url))
    }

    async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        self.get_text(url, timeout).await.map(String::into_bytes)
    }
}

#[derive(Clone, Default)]
struct RecordingHost {
    existing: Arc<Mutex<HashSet<String>>>,
    categories: Arc<Mutex<Vec<Category>>>,
    category_create_calls: Arc<Mutex<usize>>,
    fail_category_lookup: bool,
    fail_insert_slugs: HashSet<String>,
    inserted: Arc<Mutex<Vec<(PostId, NewPost)>>>,
    content_updates: Arc<Mutex<Vec<(PostId, String)>>>,
    attached: Arc<Mutex<Vec<(String, PostId)>>>,
    featured: Arc<Mutex<Vec<(PostId, AttachmentId)>>>,
}

impl RecordingHost {
    async fn inserted(&self) -> Vec<(PostId, NewPost)> {
        self.inserted.lock().await.clone()
    }

    async fn content_updates(&self) -> Vec<(PostId, String)> {
        self.content_updates.lock().await.clone()
    }

    async fn attached(&self) -> Vec<(String, PostId)> {
        self.attached.lock().await.clone()
    }
}

#[async_trait]
impl HostStore for RecordingHost {
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        if self.fail_category_lookup {
            return Err(anyhow!("terms table unavailable"));
        }
        let cats = self.categories.lock().await;
        Ok(cats.iter().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, name: &str, slug: &str) -> Result<Category> {
        *self.category_create_calls.lock().await += 1;
        let mut cats = self.categories.lock().await;
        let cat = Category {
            id: 100 + cats.len() as i64,
            name: name.into(),
            slug: slug.into(),
        };
        cats.push(cat.clone());
        Ok(cat)
    }

    async fn post_exists(&self, slug: &str) -> Result<bool> {
        Ok(self.existing.lock().await.contains(slug))
    }

    async fn insert_post(&self, post: &NewPost) -> Result<PostId> {
        if self.fail_insert_slugs.contains(&post.slug) {
            return Err(anyhow!("insert rejected"));
        }
        self.existing.lock().await.insert(post.slug.clone());
        let mut inserted = self.inserted.lock().await;
        let id = inserted.len() as PostId + 1;
        inserted.push((id, post.clone()));
        Ok(id)
    }

    async fn update_post_content(&self, id: PostId, content: &str) -> Result<()> {
        self.content_updates
            .lock()
            .await
            .push((id, content.to_string()));
        Ok(())
    }

    async fn download_and_attach_image(&self, url: &str, post_id: PostId) -> Result<AttachmentId> {
        let mut attached = self.attached.lock().await;
        attached.push((url.to_string(), post_id));
        Ok(attached.len() as AttachmentId + 500)
    }

    async fn set_featured_image(&self, post_id: PostId, attachment_id: AttachmentId) -> Result<()> {
        self.featured.lock().await.push((post_id, attachment_id));
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingSeo {
    meta: Arc<Mutex<Vec<(PostId, String, String)>>>,
    reindexed: Arc<Mutex<Vec<PostId>>>,
}

#[async_trait]
impl SeoHook for RecordingSeo {
    async fn set_post_meta(&self, post_id: PostId, key: &str, value: &str) -> Result<()> {
        self.meta
            .lock()
            .await
            .push((post_id, key.to_string(), value.to_string()));
        Ok(())
    }

    async fn trigger_reindex(&self, post_id: PostId) -> Result<()> {
        self.reindexed.lock().await.push(post_id);
        Ok(())
    }
}

struct FixedProvider(&'static str);

#[async_trait]
impl CompletionProvider for FixedProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }

    async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
        Ok(self.0.to_string())
    }
}

fn base_config() -> SyncConfig {
    let mut cfg = config::parse("app:\n  data_dir: \"./data\"\n").unwrap();
    cfg.sources = vec![SOURCE.to_string()];
    cfg.images.fetch_featured = false;
    cfg
}

fn posts_json(posts: &[(&str, &str, &str)]) -> String {
    let items: Vec<_> = posts
        .iter()
        .map(|(slug, title, content)| {
            serde_json::json!({
                "slug": slug,
                "title": { "rendered": title },
                "content": { "rendered": content },
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}

async fn run(cfg: &SyncConfig, http: &FakeHttp, host: &RecordingHost) -> wp_autosync::model::SyncReport {
    let enhancer = AiEnhancer::disabled();
    SyncOrchestrator::new(cfg, http, host, &enhancer)
        .run_sync(false)
        .await
}

#[tokio::test]
async fn fetcher_falls_back_to_first_array_endpoint() {
    let body = posts_json(&[("job-a", "Job A", "<p>A</p>")]);
    let http = FakeHttp::with(&[(EP1, "{}"), (EP2, &body), (EP3, "[]")]);

    let posts = fetch_posts(&http, SOURCE).await;

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].slug.as_deref(), Some("job-a"));
    assert_eq!(http.requested().await, vec![EP1, EP2]);
}

#[tokio::test]
async fn fetcher_returns_empty_when_all_endpoints_fail() {
    let http = FakeHttp::with(&[(EP2, "<html>oops</html>")]);

    let posts = fetch_posts(&http, SOURCE).await;

    assert!(posts.is_empty());
    assert_eq!(http.requested().await, vec![EP1, EP2, EP3]);
}

#[tokio::test]
async fn same_slug_twice_publishes_once() {
    let body = posts_json(&[
        ("dev-role", "Dev Role", "<p>one</p>"),
        ("dev-role", "Dev Role again", "<p>two</p>"),
        ("known", "Already there", "<p>x</p>"),
    ]);
    let http = FakeHttp::with(&[(EP1, &body)]);
    let host = RecordingHost::default();
    host.existing.lock().await.insert("known".into());

    let report = run(&base_config(), &http, &host).await;

    let inserted = host.inserted().await;
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].1.slug, "dev-role");
    assert_eq!(inserted[0].1.content, "<p>one</p>");
    assert_eq!(report.published, 1);
    assert_eq!(report.duplicates_skipped, 2);
    assert_eq!(report.posts_fetched, 3);
}

#[tokio::test]
async fn publishes_transformed_post_with_category_and_cta() {
    let body = posts_json(&[(
        "",
        "Senior Dev",
        r#"<p>Acme rocks</p><a href="http://x.com">Apply</a> visit http://y.com"#,
    )]);
    let http = FakeHttp::with(&[(EP1, &body)]);
    let host = RecordingHost::default();
    let mut cfg = base_config();
    cfg.filters.remove_from_title = vec!["Senior".into()];
    cfg.filters.replacement_pairs = vec![
        ReplacementPair {
            search: "Senior Dev".into(),
            replace: "Lead".into(),
        },
        ReplacementPair {
            search: "Acme".into(),
            replace: "Globex".into(),
        },
    ];
    cfg.filters.strip_links = true;

    let report = run(&cfg, &http, &host).await;
    assert_eq!(report.published, 1);

    let inserted = host.inserted().await;
    let (id, post) = &inserted[0];
    assert_eq!(post.title, "Dev");
    assert_eq!(post.content, "<p>Globex rocks</p>Apply visit ");
    assert_eq!(post.slug, "senior-dev");
    assert_eq!(post.status, PostStatus::Publish);
    assert_eq!(post.author_id, 1);
    assert_eq!(post.categories, vec![100]);

    let updates = host.content_updates().await;
    assert_eq!(updates, vec![(*id, format!("<p>Globex rocks</p>Apply visit {}", CTA_HTML))]);

    let cats = host.categories.lock().await.clone();
    assert_eq!(cats.len(), 1);
    assert_eq!(cats[0].slug, "latest-jobs");
}

#[tokio::test]
async fn existing_category_is_reused() {
    let http = FakeHttp::with(&[(EP1, "[]")]);
    let host = RecordingHost::default();
    host.categories.lock().await.push(Category {
        id: 7,
        name: "Latest Jobs".into(),
        slug: "latest-jobs".into(),
    });

    run(&base_config(), &http, &host).await;

    assert_eq!(*host.category_create_calls.lock().await, 0);
}

#[tokio::test]
async fn category_failure_publishes_uncategorized() {
    let body = posts_json(&[("a", "A", "")]);
    let http = FakeHttp::with(&[(EP1, &body)]);
    let host = RecordingHost {
        fail_category_lookup: true,
        ..Default::default()
    };

    run(&base_config(), &http, &host).await;

    let inserted = host.inserted().await;
    assert_eq!(inserted.len(), 1);
    assert!(inserted[0].1.categories.is_empty());
}

#[tokio::test]
async fn no_sources_is_a_noop() {
    let http = FakeHttp::default();
    let host = RecordingHost::default();
    let mut cfg = base_config();
    cfg.sources.clear();

    let report = run(&cfg, &http, &host).await;

    assert_eq!(report, Default::default());
    assert!(http.requested().await.is_empty());
    assert!(host.inserted().await.is_empty());
}

#[tokio::test]
async fn blank_sources_are_skipped() {
    let http = FakeHttp::default();
    let host = RecordingHost::default();
    let mut cfg = base_config();
    cfg.sources = vec!["".into(), "   ".into()];

    let report = run(&cfg, &http, &host).await;

    assert_eq!(report.sources_visited, 0);
    assert!(http.requested().await.is_empty());
}

#[tokio::test]
async fn failed_insert_has_no_side_effects_and_loop_continues() {
    let body = posts_json(&[("bad", "Bad Post", ""), ("good", "Good Post", "")]);
    let http = FakeHttp::with(&[(EP1, &body)]);
    let host = RecordingHost {
        fail_insert_slugs: HashSet::from(["bad".to_string()]),
        ..Default::default()
    };
    let seo = RecordingSeo::default();
    let mut cfg = base_config();
    cfg.images.fetch_featured = true;
    cfg.images.custom_featured_url = Some("https://cdn.example/banner.png".into());
    let enhancer = AiEnhancer::disabled();

    let report = SyncOrchestrator::new(&cfg, &http, &host, &enhancer)
        .with_seo(&seo)
        .run_sync(true)
        .await;

    assert_eq!(report.failed_inserts, 1);
    assert_eq!(report.published, 1);
    let inserted = host.inserted().await;
    assert_eq!(inserted.len(), 1);
    let good_id = inserted[0].0;
    assert!(host.content_updates().await.iter().all(|(id, _)| *id == good_id));
    assert!(host.attached().await.iter().all(|(_, id)| *id == good_id));
    assert_eq!(*seo.reindexed.lock().await, vec![good_id]);
}

#[tokio::test]
async fn custom_featured_url_overrides_remote_image() {
    let body = serde_json::json!([{
        "slug": "with-media",
        "title": { "rendered": "With Media" },
        "content": { "rendered": "<img src=\"https://src.example/inline.jpg\">" },
        "featured_media": 7
    }])
    .to_string();
    let http = FakeHttp::with(&[
        (EP1, &body),
        ("https://src.example/wp-json/wp/v2/media/7", r#"{"source_url":"https://src.example/featured.jpg"}"#),
    ]);
    let host = RecordingHost::default();
    let mut cfg = base_config();
    cfg.images.fetch_featured = true;
    cfg.images.custom_featured_url = Some("https://cdn.example/override.png".into());

    let report = run(&cfg, &http, &host).await;

    assert_eq!(host.attached().await, vec![("https://cdn.example/override.png".to_string(), 1)]);
    assert_eq!(*host.featured.lock().await, vec![(1, 501)]);
    assert_eq!(report.images_attached, 1);
    assert!(!http
        .requested()
        .await
        .iter()
        .any(|u| u.contains("/wp/v2/media/")));
}

#[tokio::test]
async fn featured_media_is_resolved_then_inline_image_is_fallback() {
    let body = serde_json::json!([
        {
            "slug": "has-media",
            "title": { "rendered": "Has Media" },
            "content": { "rendered": "<img src='https://src.example/inline-1.jpg'>" },
            "featured_media": 7
        },
        {
            "slug": "broken-media",
            "title": { "rendered": "Broken Media" },
            "content": { "rendered": "<p><img alt=\"x\" src=\"https://src.example/inline-2.jpg\"></p>" },
            "featured_media": 8
        },
        {
            "slug": "no-image",
            "title": { "rendered": "No Image" },
            "content": { "rendered": "<p>text</p>" }
        }
    ])
    .to_string();
    let http = FakeHttp::with(&[
        (EP1, &body),
        ("https://src.example/wp-json/wp/v2/media/7", r#"{"source_url":"https://src.example/featured.jpg"}"#),
    ]);
    let host = RecordingHost::default();
    let mut cfg = base_config();
    cfg.images.fetch_featured = true;

    let report = run(&cfg, &http, &host).await;

    assert_eq!(
        host.attached().await,
        vec![
            ("https://src.example/featured.jpg".to_string(), 1),
            ("https://src.example/inline-2.jpg".to_string(), 2),
        ]
    );
    assert_eq!(report.images_attached, 2);
    assert_eq!(report.published, 3);
}

#[tokio::test]
async fn images_are_skipped_when_disabled() {
    let body = posts_json(&[("a", "A", "<img src=\"https://src.example/a.jpg\">")]);
    let http = FakeHttp::with(&[(EP1, &body)]);
    let host = RecordingHost::default();

    run(&base_config(), &http, &host).await;

    assert!(host.attached().await.is_empty());
}

#[tokio::test]
async fn seo_hook_receives_focus_keyword_and_reindex() {
    let body = posts_json(&[
        ("r", "Remote Senior Backend Engineer", ""),
        ("i", "Internship", ""),
    ]);
    let http = FakeHttp::with(&[(EP1, &body)]);
    let host = RecordingHost::default();
    let seo = RecordingSeo::default();
    let cfg = base_config();
    let enhancer = AiEnhancer::disabled();

    SyncOrchestrator::new(&cfg, &http, &host, &enhancer)
        .with_seo(&seo)
        .run_sync(false)
        .await;

    let meta = seo.meta.lock().await.clone();
    assert_eq!(
        meta,
        vec![
            (1, FOCUS_KEYWORD_META.to_string(), "Remote, Engineer".to_string()),
            (2, FOCUS_KEYWORD_META.to_string(), "Internship".to_string()),
        ]
    );
    assert_eq!(*seo.reindexed.lock().await, vec![1, 2]);
}

#[tokio::test]
async fn disabled_ai_keeps_transformed_text() {
    let body = posts_json(&[("a", "Original Title", "<p>Original body</p>")]);
    let http = FakeHttp::with(&[(EP1, &body)]);
    let host = RecordingHost::default();
    let mut cfg = base_config();
    cfg.ai.enabled = true;
    cfg.ai.title_instruction = "Rewrite".into();
    let enhancer = AiEnhancer::from_settings(&cfg.ai, reqwest::Client::new(), "");

    SyncOrchestrator::new(&cfg, &http, &host, &enhancer)
        .run_sync(false)
        .await;

    let inserted = host.inserted().await;
    assert_eq!(inserted[0].1.title, "Original Title");
    assert_eq!(inserted[0].1.content, "<p>Original body</p>");
}

#[tokio::test]
async fn ai_text_replaces_title_and_content() {
    let body = posts_json(&[("a", "Original Title", "<p>Original body</p>")]);
    let http = FakeHttp::with(&[(EP1, &body)]);
    let host = RecordingHost::default();
    let mut cfg = base_config();
    cfg.ai.title_instruction = "Rewrite".into();
    let enhancer = AiEnhancer::with_provider(Box::new(FixedProvider("Better Text")));

    SyncOrchestrator::new(&cfg, &http, &host, &enhancer)
        .run_sync(false)
        .await;

    let inserted = host.inserted().await;
    assert_eq!(inserted[0].1.title, "Better Text");
    assert_eq!(inserted[0].1.content, "Better Text");
    assert_eq!(inserted[0].1.slug, "a");
}
