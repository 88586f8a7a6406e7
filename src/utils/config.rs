//! Pipeline configuration loaded from `config.json`

use crate::extractor::{youtube, TitlePolicy};
use crate::utils::error::RenameError;
use crate::utils::{pattern, platform};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// What happens to the source after a verified copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Copy,
    Move,
}

/// What to do when the destination exists with different content.
/// Identical content is always treated as already done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Append `_1`, `_2`, ... before the extension
    Suffix,
    Skip,
    Overwrite,
}

/// Fully populated configuration consumed by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub plex_url: String,
    pub plex_token: String,
    pub library_section_id: String,

    /// Directories to scan, in order
    #[serde(deserialize_with = "deserialize_paths")]
    pub directory_paths: Vec<PathBuf>,
    pub scan_recursively: bool,

    /// Maximum characters kept from a resolved title
    pub title_length_limit: usize,
    pub trim_to_word_boundary: bool,
    pub title_ellipsis: String,

    pub log_file_path: PathBuf,
    pub max_log_entries: usize,

    /// Seconds to wait between files
    pub wait_timer: f64,

    /// Cron expression; informational, used by `--setup`
    pub schedule: String,

    pub max_retries: usize,
    /// Seconds between metadata attempts
    pub retry_delay: f64,

    pub filename_pattern: String,
    pub date_format: String,

    /// Empty means "the scanned directory"
    pub destination_root: String,
    pub media_extensions: Vec<String>,
    pub transfer_mode: TransferMode,
    pub on_collision: CollisionPolicy,

    pub metadata_endpoint: String,

    #[serde(skip)]
    pub interactive: bool,
    #[serde(skip)]
    pub debug: bool,
    #[serde(skip)]
    pub dry_run: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            plex_url: "http://localhost:32400".to_string(),
            plex_token: String::new(),
            library_section_id: String::new(),
            directory_paths: Vec::new(),
            scan_recursively: true,
            title_length_limit: 50,
            trim_to_word_boundary: true,
            title_ellipsis: String::new(),
            log_file_path: platform::default_log_path(),
            max_log_entries: 1000,
            wait_timer: 10.0,
            schedule: String::new(),
            max_retries: 3,
            retry_delay: 5.0,
            filename_pattern: "{title}.mp4".to_string(),
            date_format: pattern::DEFAULT_DATE_FORMAT.to_string(),
            destination_root: String::new(),
            media_extensions: vec!["mp4".to_string()],
            transfer_mode: TransferMode::Move,
            on_collision: CollisionPolicy::Suffix,
            metadata_endpoint: youtube::DEFAULT_ENDPOINT.to_string(),
            interactive: false,
            debug: false,
            dry_run: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PathList {
    /// Original comma-separated form
    Joined(String),
    List(Vec<String>),
}

fn deserialize_paths<'de, D>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match PathList::deserialize(deserializer)? {
        PathList::Joined(s) => s.split(',').map(str::to_string).collect(),
        PathList::List(v) => v,
    };
    Ok(raw
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect())
}

impl PipelineConfig {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        info!(config_path = ?path, "Loading configuration");

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Config file {:?} is not valid JSON", path))?;

        config.validate()?;
        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RenameError> {
        let fail = |msg: &str| Err(RenameError::ConfigError(msg.to_string()));

        if self.directory_paths.is_empty() {
            return fail("directory_paths must list at least one directory");
        }
        if self.filename_pattern.trim().is_empty() {
            return fail("filename_pattern must not be empty");
        }
        if self.title_length_limit == 0 {
            return fail("title_length_limit must be positive");
        }
        if self.max_log_entries == 0 {
            return fail("max_log_entries must be positive");
        }
        if !self.wait_timer.is_finite() || self.wait_timer < 0.0 {
            return fail("wait_timer must be a non-negative number");
        }
        if !self.retry_delay.is_finite() || self.retry_delay < 0.0 {
            return fail("retry_delay must be a non-negative number");
        }
        if !pattern::is_valid_date_format(&self.date_format) {
            return Err(RenameError::ConfigError(format!(
                "date_format {:?} is not a valid strftime format",
                self.date_format
            )));
        }
        if self.media_extensions.iter().all(|e| e.trim().is_empty()) {
            return fail("media_extensions must name at least one extension");
        }
        Ok(())
    }

    /// Set the CLI-provided flags
    pub fn with_flags(mut self, interactive: bool, debug: bool, dry_run: bool) -> Self {
        self.interactive = interactive;
        self.debug = debug;
        self.dry_run = dry_run;
        self
    }

    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs_f64(self.wait_timer.max(0.0))
    }

    pub fn retry_duration(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay.max(0.0))
    }

    pub fn title_policy(&self) -> TitlePolicy {
        TitlePolicy {
            max_chars: self.title_length_limit,
            trim_to_word_boundary: self.trim_to_word_boundary,
            ellipsis: self.title_ellipsis.clone(),
        }
    }

    /// Destination root for files found under `scanned_dir`
    pub fn destination_for(&self, scanned_dir: &Path) -> PathBuf {
        if self.destination_root.trim().is_empty() {
            scanned_dir.to_path_buf()
        } else {
            PathBuf::from(self.destination_root.trim())
        }
    }

    /// Lowercased extensions without leading dots
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.media_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}
