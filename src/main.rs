//! tuberename - rename downloaded YouTube videos by title and sort them into
//! channel folders.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tuberename::app::{self, RunOptions};
use tuberename::utils::default_config_path;

#[derive(Parser)]
#[command(
    name = "tuberename",
    version,
    about = "Rename video files with their YouTube titles and organize them by channel"
)]
struct Args {
    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// Run in debug mode with verbose output
    #[arg(short, long)]
    debug: bool,

    /// Set up config.json with default values
    #[arg(short, long)]
    setup: bool,

    /// Simulate actions without making changes
    #[arg(long)]
    dry_run: bool,

    /// Path to config.json
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .init();

    let config_path = args.config.unwrap_or_else(default_config_path);

    if args.setup {
        return app::setup(&config_path);
    }

    let summary = app::run(RunOptions {
        config_path,
        interactive: args.interactive,
        debug: args.debug,
        dry_run: args.dry_run,
    })
    .await?;

    println!("Rename process completed: {}", summary);
    Ok(())
}
