//! Application entry points: a rename run and the `--setup` helper

use crate::audit::AuditLog;
use crate::extractor::YoutubeOembedSource;
use crate::notifier::PlexNotifier;
use crate::pipeline::{prompt, PipelineDriver, RunSummary, StdinConfirmer};
use crate::utils::config::PipelineConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Directory used in the generated config until the user edits it
const EXAMPLE_DIRECTORY: &str = "/mnt/user/media/tubearchivist/";

/// Run flags taken from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub interactive: bool,
    pub debug: bool,
    pub dry_run: bool,
}

/// Load the configuration, process every directory and notify the media server.
///
/// Only configuration and audit-log opening errors are returned; per-file
/// problems are reported in the summary.
pub async fn run(options: RunOptions) -> Result<RunSummary> {
    let config = PipelineConfig::load(&options.config_path)?.with_flags(
        options.interactive,
        options.debug,
        options.dry_run,
    );

    let mut audit = AuditLog::open(&config.log_file_path, config.max_log_entries)
        .await
        .context("Failed to open audit log")?;

    let source = Arc::new(YoutubeOembedSource::new(&config.metadata_endpoint)?);
    let notifier = Arc::new(PlexNotifier::from_config(&config)?);

    let stop = CancellationToken::new();
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current file before stopping");
            signal_stop.cancel();
        }
    });

    let mut driver = PipelineDriver::new(&config, &mut audit, source)
        .with_notifier(notifier)
        .with_stop_token(stop);
    if config.interactive {
        driver = driver.with_confirmer(Arc::new(StdinConfirmer));
    }

    Ok(driver.run().await)
}

/// Write a default `config.json`, asking before replacing an existing one,
/// and print the crontab line for a configured schedule.
pub fn setup(config_path: &Path) -> Result<()> {
    let write = !config_path.exists()
        || prompt::ask(&format!(
            "{} already exists. Overwrite? (y/n): ",
            config_path.display()
        ));

    if write {
        let config = PipelineConfig {
            directory_paths: vec![PathBuf::from(EXAMPLE_DIRECTORY)],
            ..Default::default()
        };
        write_config(config_path, &config)?;
        println!("{} created with default values.", config_path.display());
    } else {
        println!("Setup canceled. Using existing {}.", config_path.display());
    }

    let config = PipelineConfig::load(config_path)?;
    if let Some(line) = cron_line(&config.schedule, config_path)? {
        println!("Add this line to your crontab to run on schedule:\n  {}", line);
    }
    Ok(())
}

fn write_config(path: &Path, config: &PipelineConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    info!(config_path = ?path, "Wrote default configuration");
    Ok(())
}

/// `<schedule> <this executable> --config <path>`, or `None` without a schedule
pub fn cron_line(schedule: &str, config_path: &Path) -> Result<Option<String>> {
    let schedule = schedule.trim();
    if schedule.is_empty() {
        return Ok(None);
    }
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    Ok(Some(format!(
        "{} {} --config {}",
        schedule,
        exe.display(),
        config_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn setup_writes_loadable_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.json");

        setup(&path).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.directory_paths, vec![PathBuf::from(EXAMPLE_DIRECTORY)]);
        assert_eq!(config.filename_pattern, "{title}.mp4");
    }

    #[test]
    fn cron_line_only_with_schedule() {
        let path = Path::new("/etc/tuberename.json");
        assert!(cron_line("  ", path).unwrap().is_none());
        let line = cron_line("0 3 * * *", path).unwrap().unwrap();
        assert!(line.starts_with("0 3 * * * "));
        assert!(line.ends_with("--config /etc/tuberename.json"));
    }

    #[tokio::test]
    async fn run_fails_fast_on_missing_config() {
        let temp = TempDir::new().unwrap();
        let err = run(RunOptions {
            config_path: temp.path().join("missing.json"),
            ..Default::default()
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
