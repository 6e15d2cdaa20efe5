use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wp_autosync::ai::AiEnhancer;
use wp_autosync::config;
use wp_autosync::db;
use wp_autosync::http::{build_client, ReqwestFetch};
use wp_autosync::store::LocalStore;
use wp_autosync::sync::SyncOrchestrator;

#[derive(Debug, Parser)]
#[command(author, version, about = "Mirror posts from remote WordPress sites into the local store")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Mark this run as manually triggered (recorded in the run summary)
    #[arg(long)]
    manual: bool,

    /// Print an example configuration and exit
    #[arg(long)]
    print_example: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.print_example {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))?;

    // Failures are only visible with `app.debug` unless RUST_LOG says otherwise.
    let default_filter = if cfg.app.debug { "debug" } else { "off" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .compact()
        .init();

    cfg.ensure_dirs()?;
    let data_dir = cfg.resolved_data_dir();
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/autosync.db", data_dir.display()));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let client = build_client()?;
    let http = Arc::new(ReqwestFetch::with_client(client.clone()));
    let store = LocalStore::new(pool, http.clone(), cfg.media_dir());
    let enhancer = AiEnhancer::from_settings(&cfg.ai, client, &cfg.publish.site_url);

    let orchestrator =
        SyncOrchestrator::new(&cfg, http.as_ref(), &store, &enhancer).with_seo(&store);
    let report = orchestrator.run_sync(args.manual).await;
    info!(?report, "done");

    Ok(())
}
