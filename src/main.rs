//! CLI entry point for the tagmirror tool.

use std::io::IsTerminal;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tagmirror_core::{Crawler, build_catalog, write_catalog};
use tracing::{debug, info};

mod cli;
mod progress;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let config = args.to_config();
    let media_dir = config.media_dir.clone();
    let thumb_dir = config.thumb_dir.clone();
    let catalog_path = config.catalog_path.clone();

    // Uncreatable output directories are the one fatal startup condition.
    std::fs::create_dir_all(&media_dir)
        .with_context(|| format!("failed to create media directory {}", media_dir.display()))?;
    if config.generate_thumbs {
        std::fs::create_dir_all(&thumb_dir).with_context(|| {
            format!("failed to create thumbnail directory {}", thumb_dir.display())
        })?;
    }

    let crawler = Crawler::new(config)?;

    // Spinner only when interactive and not quiet; logs carry the rest.
    let use_spinner = !args.quiet && std::io::stderr().is_terminal();
    let (ui_handle, stop) = progress::spawn_progress_ui(use_spinner, crawler.stats());

    let report = crawler.run().await;

    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = ui_handle {
        let _ = handle.await;
    }

    info!(
        pages = report.pages_fetched,
        posts = report.posts_seen,
        downloaded = report.downloaded,
        already_present = report.already_present,
        skipped = report.skipped,
        failed = report.failed,
        retried = report.retried,
        "crawl complete"
    );

    let entries = build_catalog(&media_dir, &thumb_dir)
        .with_context(|| format!("failed to build catalog from {}", media_dir.display()))?;
    write_catalog(&entries, &catalog_path)
        .with_context(|| format!("failed to write catalog to {}", catalog_path.display()))?;

    info!(
        entries = entries.len(),
        path = %catalog_path.display(),
        "catalog written"
    );

    Ok(())
}
