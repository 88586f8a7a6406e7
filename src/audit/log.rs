use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Terminal result of processing one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Success => "success",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One durable record of a single file's processing outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub video_id: String,
    pub source_path: PathBuf,
    #[serde(default)]
    pub destination_path: Option<PathBuf>,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    pub fn new(
        video_id: impl Into<String>,
        source_path: impl Into<PathBuf>,
        destination_path: Option<PathBuf>,
        outcome: Outcome,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            video_id: video_id.into(),
            source_path: source_path.into(),
            destination_path,
            outcome,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Bounded, append-only JSON Lines log of [`AuditEntry`] records.
///
/// Holds at most `max_entries` records both in memory and on disk; the
/// oldest record is evicted first. Every append is flushed and synced before
/// it returns.
#[derive(Debug)]
pub struct AuditLog {
    file_path: PathBuf,
    max_entries: usize,
    entries: VecDeque<AuditEntry>,
    writer: Option<File>,
}

impl AuditLog {
    /// Open (or create) the log at `file_path`, keeping the newest
    /// `max_entries` valid records already on disk.
    pub async fn open(file_path: impl Into<PathBuf>, max_entries: usize) -> Result<Self> {
        let file_path = file_path.into();
        let max_entries = max_entries.max(1);

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create log directory {:?}", parent))?;
        }

        let (mut entries, mut needs_rewrite) = Self::read_entries(&file_path).await?;
        while entries.len() > max_entries {
            entries.pop_front();
            needs_rewrite = true;
        }

        let mut log = Self {
            file_path,
            max_entries,
            entries,
            writer: None,
        };

        if needs_rewrite {
            log.rewrite().await?;
        } else {
            log.writer = Some(log.open_append().await?);
        }

        debug!(
            path = ?log.file_path,
            entries = log.entries.len(),
            max_entries = log.max_entries,
            "Audit log opened"
        );
        Ok(log)
    }

    async fn read_entries(file_path: &Path) -> Result<(VecDeque<AuditEntry>, bool)> {
        if !file_path.exists() {
            return Ok((VecDeque::new(), false));
        }

        let content = tokio::fs::read_to_string(file_path)
            .await
            .with_context(|| format!("Failed to read audit log {:?}", file_path))?;

        let mut entries = VecDeque::new();
        let mut had_garbage = false;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditEntry>(line) {
                Ok(entry) => entries.push_back(entry),
                Err(e) => {
                    warn!("Skipping unreadable audit log line: {}. Error: {}", line, e);
                    had_garbage = true;
                }
            }
        }
        Ok((entries, had_garbage))
    }

    async fn open_append(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)
            .await
            .with_context(|| format!("Failed to open audit log {:?}", self.file_path))
    }

    /// Append one entry, evicting the oldest if the log is full.
    ///
    /// The in-memory window only changes once the disk write succeeded.
    pub async fn append(&mut self, entry: AuditEntry) -> Result<()> {
        if self.entries.len() >= self.max_entries {
            self.entries.push_back(entry);
            let evicted = self.entries.pop_front();
            if let Err(e) = self.rewrite().await {
                self.entries.pop_back();
                if let Some(evicted) = evicted {
                    self.entries.push_front(evicted);
                }
                return Err(e);
            }
            return Ok(());
        }

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        if let Err(e) = self.write_line(&line).await {
            self.writer = None;
            return Err(e);
        }
        self.entries.push_back(entry);
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        if self.writer.is_none() {
            self.writer = Some(self.open_append().await?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
            writer.sync_data().await?;
        }
        Ok(())
    }

    /// Replace the file with the retained window via temp file + rename, so
    /// a crash leaves either the old or the new window, never a partial one.
    async fn rewrite(&mut self) -> Result<()> {
        self.writer = None;

        let mut body = String::new();
        for entry in &self.entries {
            body.push_str(&serde_json::to_string(entry)?);
            body.push('\n');
        }

        let tmp_path = self.tmp_path();
        let mut tmp = File::create(&tmp_path)
            .await
            .with_context(|| format!("Failed to create {:?}", tmp_path))?;
        tmp.write_all(body.as_bytes()).await?;
        tmp.flush().await?;
        tmp.sync_all().await?;
        drop(tmp);

        tokio::fs::rename(&tmp_path, &self.file_path)
            .await
            .with_context(|| format!("Failed to replace audit log {:?}", self.file_path))?;

        self.writer = Some(self.open_append().await?);
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }

    /// Retained entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Most recent successful entry recorded for `source_path`
    pub fn last_success_for(&self, source_path: &Path) -> Option<&AuditEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.outcome == Outcome::Success && e.source_path == source_path)
    }

    /// Whether `path` is where a successful run placed a file
    pub fn is_recorded_destination(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| {
            e.outcome == Outcome::Success && e.destination_path.as_deref() == Some(path)
        })
    }
}
