//! Dry run: fetch one source and print how each post would be published.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use wp_autosync::config;
use wp_autosync::fetcher::fetch_posts;
use wp_autosync::http::ReqwestFetch;
use wp_autosync::slug::candidate_slug;
use wp_autosync::transform::transform;

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config (filters are taken from it)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Source base URL to preview
    #[arg(long)]
    source: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let http = ReqwestFetch::new()?;

    let posts = fetch_posts(&http, &args.source).await;
    println!("{} post(s) from {}", posts.len(), args.source);
    for post in &posts {
        let out = transform(post.title_html(), post.content_html(), &cfg.filters);
        println!("- [{}] {}", candidate_slug(post), out.title);
        if let Some(media_id) = post.featured_media_id() {
            println!("    featured media: {}", media_id);
        }
    }
    Ok(())
}
