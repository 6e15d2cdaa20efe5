use super::model::{StoredAttachment, StoredPost};
use crate::model::{Category, NewPost, PostStatus};
use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use sqlx::SqlitePool;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    // Every connection to an in-memory database is a separate database.
    let options = if normalized.starts_with("sqlite::memory") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    let pool = options.connect(&normalized).await?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// Expand a leading `~/` in a file-backed SQLite URL, ensure the parent
/// directory exists and ask SQLite to create the file. In-memory URLs pass through.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{}?{}", path, q),
        None => format!("sqlite://{}?mode=rwc", path),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn find_category_by_slug(pool: &Pool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, slug FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| Category {
        id: r.get("id"),
        name: r.get("name"),
        slug: r.get("slug"),
    }))
}

#[instrument(skip(pool))]
pub async fn insert_category(pool: &Pool, name: &str, slug: &str) -> Result<Category> {
    let id: i64 = sqlx::query("INSERT INTO categories (name, slug) VALUES (?, ?) RETURNING id")
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await?
        .get("id");
    Ok(Category {
        id,
        name: name.to_string(),
        slug: slug.to_string(),
    })
}

#[instrument(skip(pool))]
pub async fn post_exists(pool: &Pool, slug: &str) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE slug = ? LIMIT 1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Insert a post and its category links in one transaction.
#[instrument(skip_all, fields(slug = %post.slug))]
pub async fn insert_post(pool: &Pool, post: &NewPost) -> Result<i64> {
    if post.slug.trim().is_empty() {
        return Err(anyhow!("post slug must be non-empty"));
    }
    let mut tx = pool.begin().await?;
    let post_id: i64 = sqlx::query(
        "INSERT INTO posts (title, content, status, author_id, slug) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(post.status.as_str())
    .bind(post.author_id)
    .bind(&post.slug)
    .fetch_one(&mut *tx)
    .await?
    .get("id");
    for category_id in &post.categories {
        sqlx::query("INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?, ?)")
            .bind(post_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(post_id)
}

#[instrument(skip(pool, content))]
pub async fn update_post_content(pool: &Pool, post_id: i64, content: &str) -> Result<()> {
    let res = sqlx::query(
        "UPDATE posts SET content = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(content)
    .bind(post_id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("post {} not found", post_id));
    }
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_post(pool: &Pool, post_id: i64) -> Result<Option<StoredPost>> {
    let Some(row) = sqlx::query(
        "SELECT id, title, content, status, author_id, slug, featured_attachment_id, created_at FROM posts WHERE id = ?",
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let status: String = row.get("status");
    let categories: Vec<i64> = sqlx::query_scalar(
        "SELECT category_id FROM post_categories WHERE post_id = ? ORDER BY category_id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(StoredPost {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        status: PostStatus::parse_status(&status)
            .ok_or_else(|| anyhow!("unknown post status {}", status))?,
        author_id: row.get("author_id"),
        slug: row.get("slug"),
        featured_attachment_id: row.get("featured_attachment_id"),
        categories,
        created_at: row.get::<NaiveDateTime, _>("created_at"),
    }))
}

#[instrument(skip(pool))]
pub async fn count_posts(pool: &Pool) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

#[instrument(skip(pool))]
pub async fn insert_attachment(
    pool: &Pool,
    post_id: i64,
    source_url: &str,
    file_path: &str,
    mime_type: &str,
) -> Result<i64> {
    let id: i64 = sqlx::query(
        "INSERT INTO attachments (post_id, source_url, file_path, mime_type) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(post_id)
    .bind(source_url)
    .bind(file_path)
    .bind(mime_type)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

#[instrument(skip(pool))]
pub async fn get_attachment(pool: &Pool, attachment_id: i64) -> Result<Option<StoredAttachment>> {
    let row = sqlx::query(
        "SELECT id, post_id, source_url, file_path, mime_type FROM attachments WHERE id = ?",
    )
    .bind(attachment_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| StoredAttachment {
        id: r.get("id"),
        post_id: r.get("post_id"),
        source_url: r.get("source_url"),
        file_path: r.get("file_path"),
        mime_type: r.get("mime_type"),
    }))
}

#[instrument(skip(pool))]
pub async fn set_featured_attachment(pool: &Pool, post_id: i64, attachment_id: i64) -> Result<()> {
    let res = sqlx::query(
        "UPDATE posts SET featured_attachment_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(attachment_id)
    .bind(post_id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("post {} not found", post_id));
    }
    Ok(())
}

#[instrument(skip(pool, value))]
pub async fn upsert_post_meta(pool: &Pool, post_id: i64, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO post_meta (post_id, meta_key, meta_value) VALUES (?, ?, ?) \
         ON CONFLICT(post_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
    )
    .bind(post_id)
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_post_meta(pool: &Pool, post_id: i64, key: &str) -> Result<Option<String>> {
    let value = sqlx::query_scalar::<_, String>(
        "SELECT meta_value FROM post_meta WHERE post_id = ? AND meta_key = ?",
    )
    .bind(post_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(value)
}

#[instrument(skip(pool))]
pub async fn enqueue_reindex(pool: &Pool, post_id: i64) -> Result<()> {
    sqlx::query("INSERT INTO reindex_queue (post_id) VALUES (?)")
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn count_reindex_requests(pool: &Pool, post_id: i64) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reindex_queue WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await?;
    Ok(n)
}
