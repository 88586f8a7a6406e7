//! Sequential per-file pipeline: extract → resolve → render → organize → audit

use crate::audit::{AuditEntry, AuditLog, Outcome};
use crate::extractor::{MetadataResolver, MetadataSource, Resolution, SourceFile, VideoIdentifier};
use crate::notifier::LibraryNotifier;
use crate::pipeline::prompt::Confirmer;
use crate::pipeline::scanner::{absolute, scan_checked};
use crate::utils::config::{PipelineConfig, TransferMode};
use crate::utils::organizer::{files_identical, FileOrganizer, OrganizationSettings, PlannedAction};
use crate::utils::pattern::PatternRenderer;
use chrono::Local;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counts of terminal outcomes for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.processed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} failed",
            self.processed, self.skipped, self.failed
        )
    }
}

/// Drives one run over every configured directory.
///
/// Borrows the configuration and the audit log; both outlive the driver.
pub struct PipelineDriver<'a> {
    config: &'a PipelineConfig,
    audit: &'a mut AuditLog,
    resolver: MetadataResolver,
    organizer: FileOrganizer,
    confirmer: Option<Arc<dyn Confirmer>>,
    notifier: Option<Arc<dyn LibraryNotifier>>,
    stop: CancellationToken,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        audit: &'a mut AuditLog,
        source: Arc<dyn MetadataSource>,
    ) -> Self {
        let resolver = MetadataResolver::new(
            source,
            config.max_retries,
            config.retry_duration(),
            config.title_policy(),
        );
        let organizer = FileOrganizer::new(
            PatternRenderer::new(config.filename_pattern.clone(), config.date_format.clone()),
            OrganizationSettings {
                transfer_mode: config.transfer_mode,
                on_collision: config.on_collision,
            },
        );

        Self {
            config,
            audit,
            resolver,
            organizer,
            confirmer: None,
            notifier: None,
            stop: CancellationToken::new(),
        }
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = Some(confirmer);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn LibraryNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Token checked between files; cancelling it ends the run after the
    /// current file.
    pub fn with_stop_token(mut self, stop: CancellationToken) -> Self {
        self.stop = stop;
        self
    }

    /// Process every candidate file. Never fails: per-file errors end up
    /// in the audit log and the summary.
    pub async fn run(&mut self) -> RunSummary {
        let config = self.config;
        let mut summary = RunSummary::default();
        let extensions = config.normalized_extensions();
        let wait = config.wait_duration();
        let mut first = true;

        info!(
            directories = config.directory_paths.len(),
            dry_run = config.dry_run,
            interactive = config.interactive,
            "Starting rename run"
        );

        'dirs: for dir in &config.directory_paths {
            let mut files = match scan_checked(dir, config.scan_recursively, &extensions) {
                Ok(files) => files,
                Err(e) => {
                    warn!("{:#}. Skipping.", e);
                    continue;
                }
            };
            let root = absolute(&config.destination_for(dir));
            let scanned = absolute(dir);
            files.retain(|file| !self.is_organized_output(file, &scanned, &root));
            info!(dir = ?dir, files = files.len(), destination = ?root, "Scanning directory");

            for file in files {
                if self.stop.is_cancelled() {
                    info!("Stop requested, ending run before {:?}", file.path);
                    break 'dirs;
                }

                if !first && !wait.is_zero() {
                    debug!("Waiting {:?} before next file", wait);
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = self.stop.cancelled() => {
                            info!("Stop requested during wait, ending run");
                            break 'dirs;
                        }
                    }
                }
                first = false;

                let outcome = self.process_file(&file, &root).await;
                summary.record(outcome);
            }
        }

        if !config.dry_run {
            self.notify().await;
        }

        info!(%summary, "Rename run completed");
        summary
    }

    async fn process_file(&mut self, file: &SourceFile, root: &Path) -> Outcome {
        let id = VideoIdentifier::from_source(file);
        info!(video_id = %id, path = ?file.path, "Processing");
        if !id.is_plausible() {
            debug!(video_id = %id, "File stem does not look like a YouTube video id");
        }

        if let Some(entry) = self.replay_skip(file, &id).await {
            return self.record(entry).await;
        }

        let metadata = match self.resolver.resolve(&id).await {
            Resolution::Resolved(metadata) => metadata,
            Resolution::Exhausted(failure) => {
                let entry = AuditEntry::new(id.as_str(), &file.path, None, Outcome::Failed)
                    .with_error(format!(
                        "metadata lookup failed after {} attempts: {}",
                        failure.attempts, failure.last_error
                    ));
                return self.record(entry).await;
            }
        };

        let now = Local::now();
        let placement = match self.organizer.plan(file, &id, &metadata, root, now).await {
            Ok(placement) => placement,
            Err(e) => {
                let entry =
                    AuditEntry::new(id.as_str(), &file.path, None, Outcome::Failed).with_error(e);
                return self.record(entry).await;
            }
        };

        if self.config.dry_run {
            let outcome = match placement.action {
                PlannedAction::Write | PlannedAction::Overwrite => Outcome::Success,
                PlannedAction::AlreadyPresent | PlannedAction::Conflict => Outcome::Skipped,
            };
            println!(
                "[DRY RUN] Would {} '{}' to '{}' ({})",
                match self.organizer.settings().transfer_mode {
                    TransferMode::Copy => "copy",
                    TransferMode::Move => "move",
                },
                file.path.display(),
                placement.destination.display(),
                outcome
            );
            info!(
                video_id = %id,
                source = ?file.path,
                destination = ?placement.destination,
                %outcome,
                "Dry run, nothing written"
            );
            return outcome;
        }

        if self.config.interactive && placement.writes() {
            let reason = match self.confirmer.clone() {
                Some(confirmer) => {
                    if confirmer.confirm(&file.path, &placement.destination).await {
                        None
                    } else {
                        info!(video_id = %id, "Declined by user");
                        Some("declined by user")
                    }
                }
                None => {
                    warn!(video_id = %id, "Interactive run without a confirmer, not writing");
                    Some("no confirmation available")
                }
            };
            if let Some(reason) = reason {
                let entry = AuditEntry::new(
                    id.as_str(),
                    &file.path,
                    Some(placement.destination.clone()),
                    Outcome::Skipped,
                )
                .with_error(reason);
                return self.record(entry).await;
            }
        }

        let entry = self.organizer.execute(file, &id, &placement).await;
        self.record(entry).await
    }

    /// Files this tool produced are not sources.
    ///
    /// Matches any destination recorded as a success, and anything under a
    /// separate destination root nested inside the scanned directory.
    fn is_organized_output(&self, file: &SourceFile, scanned: &Path, root: &Path) -> bool {
        if self.audit.is_recorded_destination(&file.path) {
            debug!(path = ?file.path, "Previously organized output, not a source");
            return true;
        }
        if root != scanned && root.starts_with(scanned) && file.path.starts_with(root) {
            debug!(path = ?file.path, "Inside destination root, not a source");
            return true;
        }
        false
    }

    /// A previous successful run already placed identical bytes for this
    /// source; skip without a metadata lookup.
    async fn replay_skip(&self, file: &SourceFile, id: &VideoIdentifier) -> Option<AuditEntry> {
        let previous = self.audit.last_success_for(&file.path)?;
        let destination = previous.destination_path.clone()?;

        match files_identical(&file.path, &destination).await {
            Ok(true) => {
                info!(video_id = %id, destination = ?destination, "Already renamed, skipping");
                Some(AuditEntry::new(
                    id.as_str(),
                    &file.path,
                    Some(destination),
                    Outcome::Skipped,
                ))
            }
            Ok(false) | Err(_) => None,
        }
    }

    async fn record(&mut self, entry: AuditEntry) -> Outcome {
        let outcome = entry.outcome;
        if let Some(err) = &entry.error {
            debug!(video_id = %entry.video_id, %outcome, error = %err, "Recording outcome");
        }
        if let Err(e) = self.audit.append(entry).await {
            error!("Failed to write audit log {:?}: {:#}", self.audit.path(), e);
        }
        outcome
    }

    async fn notify(&self) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.refresh().await {
            warn!(notifier = notifier.id(), error = %e, "Library refresh failed");
        }
    }
}
