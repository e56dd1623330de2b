use std::path::{Path, PathBuf};

mod config;
mod db;
mod error;
mod feed;
mod models;
mod pipeline;
mod services;
mod stats;

use config::Config;
use error::Result;
use models::FeedSource;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments. `--fetch` is the default (and only)
    // action; `--config <path>` selects an alternate config file.
    let mut config_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--fetch" => {}
            "--config" => {
                config_path = args.next().map(PathBuf::from);
                if config_path.is_none() {
                    eprintln!("--config requires a file path");
                    std::process::exit(2);
                }
            }
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("usage: haber-ingest [--fetch] [--config <path>]");
                std::process::exit(2);
            }
        }
    }

    // Load configuration
    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    // Load the feed list and run one full ingestion pass. Scheduling of
    // repeated passes is left to an external timer (cron, systemd).
    let feeds = FeedSource::load(Path::new(&config.feeds_path))?;
    let pipeline = Pipeline::new(&config).await?;

    let run_stats = pipeline.run(&feeds).await;
    let artifact = run_stats.write_to(Path::new(&config.stats_dir))?;

    println!(
        "Ingested {} new articles from {} feeds ({} ok, {} failed) in {}s",
        run_stats.summary.total_new_articles,
        run_stats.summary.total_feeds,
        run_stats.summary.successful_feeds,
        run_stats.summary.failed_feeds,
        run_stats.duration.seconds,
    );
    println!("Run statistics written to {}", artifact.display());

    Ok(())
}
