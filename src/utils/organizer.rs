//! Channel-folder organization with collision-safe, verified writes

use crate::audit::{AuditEntry, Outcome};
use crate::extractor::{SourceFile, VideoIdentifier, VideoMetadata};
use crate::utils::config::{CollisionPolicy, TransferMode};
use crate::utils::error::RenameError;
use crate::utils::pattern::{sanitize_filename, PatternRenderer, RenderedName};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};
use uuid::Uuid;

const MAX_SUFFIX: usize = 10_000;
const COMPARE_CHUNK: usize = 64 * 1024;

/// Organizer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganizationSettings {
    pub transfer_mode: TransferMode,
    pub on_collision: CollisionPolicy,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            transfer_mode: TransferMode::Move,
            on_collision: CollisionPolicy::Suffix,
        }
    }
}

/// What the organizer intends to do with a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Destination is free
    Write,
    /// Destination exists with different content and will be replaced
    Overwrite,
    /// Destination already holds identical bytes
    AlreadyPresent,
    /// Destination exists with different content and the policy says skip
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub destination: PathBuf,
    pub action: PlannedAction,
}

impl Placement {
    pub fn writes(&self) -> bool {
        matches!(self.action, PlannedAction::Write | PlannedAction::Overwrite)
    }
}

/// Places source files under `<root>/<channel>/<rendered name>`
#[derive(Debug, Clone)]
pub struct FileOrganizer {
    renderer: PatternRenderer,
    settings: OrganizationSettings,
}

impl FileOrganizer {
    pub fn new(renderer: PatternRenderer, settings: OrganizationSettings) -> Self {
        Self { renderer, settings }
    }

    pub fn settings(&self) -> &OrganizationSettings {
        &self.settings
    }

    /// `<root>/<sanitized channel name>`
    pub fn determine_target_directory(root: &Path, metadata: &VideoMetadata) -> PathBuf {
        root.join(sanitize_filename(&metadata.channel_name))
    }

    pub fn render_name(
        &self,
        source: &SourceFile,
        id: &VideoIdentifier,
        metadata: &VideoMetadata,
        now: DateTime<Local>,
    ) -> RenderedName {
        self.renderer.render(id, metadata, source, now)
    }

    /// Work out the destination without writing anything.
    pub async fn plan(
        &self,
        source: &SourceFile,
        id: &VideoIdentifier,
        metadata: &VideoMetadata,
        root: &Path,
        now: DateTime<Local>,
    ) -> Result<Placement, RenameError> {
        let target_dir = Self::determine_target_directory(root, metadata);
        let name = self.render_name(source, id, metadata, now);
        self.resolve_collision(&source.path, &target_dir, &name).await
    }

    async fn resolve_collision(
        &self,
        source_path: &Path,
        target_dir: &Path,
        name: &RenderedName,
    ) -> Result<Placement, RenameError> {
        let (stem, ext) = split_name(name.as_str());

        for n in 0..=MAX_SUFFIX {
            let candidate = if n == 0 {
                target_dir.join(name.as_str())
            } else {
                target_dir.join(format!("{}_{}{}", stem, n, ext))
            };

            if !fs::try_exists(&candidate).await? {
                return Ok(Placement {
                    destination: candidate,
                    action: PlannedAction::Write,
                });
            }

            if files_identical(source_path, &candidate).await? {
                debug!(destination = ?candidate, "Destination already holds identical content");
                return Ok(Placement {
                    destination: candidate,
                    action: PlannedAction::AlreadyPresent,
                });
            }

            match self.settings.on_collision {
                CollisionPolicy::Skip => {
                    return Ok(Placement {
                        destination: candidate,
                        action: PlannedAction::Conflict,
                    })
                }
                CollisionPolicy::Overwrite => {
                    return Ok(Placement {
                        destination: candidate,
                        action: PlannedAction::Overwrite,
                    })
                }
                CollisionPolicy::Suffix => {
                    debug!(destination = ?candidate, "Destination taken, trying next suffix");
                }
            }
        }

        Err(RenameError::VerificationFailed(format!(
            "no free name for {} in {:?}",
            name, target_dir
        )))
    }

    /// Plan and carry out the write for one file.
    pub async fn organize(
        &self,
        source: &SourceFile,
        id: &VideoIdentifier,
        metadata: &VideoMetadata,
        root: &Path,
        now: DateTime<Local>,
    ) -> AuditEntry {
        match self.plan(source, id, metadata, root, now).await {
            Ok(placement) => self.execute(source, id, &placement).await,
            Err(e) => {
                warn!(source = ?source.path, error = %e, "Could not plan destination");
                AuditEntry::new(id.as_str(), &source.path, None, Outcome::Failed).with_error(e)
            }
        }
    }

    /// Carry out a previously computed placement.
    ///
    /// The source is left untouched on any failure before verification.
    pub async fn execute(
        &self,
        source: &SourceFile,
        id: &VideoIdentifier,
        placement: &Placement,
    ) -> AuditEntry {
        let destination = Some(placement.destination.clone());

        match placement.action {
            PlannedAction::AlreadyPresent => {
                info!(source = ?source.path, destination = ?placement.destination, "Already organized, skipping");
                return AuditEntry::new(id.as_str(), &source.path, destination, Outcome::Skipped);
            }
            PlannedAction::Conflict => {
                info!(destination = ?placement.destination, "Destination exists with different content, skipping");
                return AuditEntry::new(id.as_str(), &source.path, destination, Outcome::Skipped)
                    .with_error("destination exists with different content");
            }
            PlannedAction::Write | PlannedAction::Overwrite => {}
        }

        if let Err(e) = self.copy_verified(&source.path, &placement.destination).await {
            warn!(source = ?source.path, destination = ?placement.destination, error = %e, "Write failed");
            return AuditEntry::new(id.as_str(), &source.path, destination, Outcome::Failed)
                .with_error(e);
        }

        if self.settings.transfer_mode == TransferMode::Move {
            if let Err(e) = fs::remove_file(&source.path).await {
                warn!(source = ?source.path, error = %e, "Copied but could not remove source");
                return AuditEntry::new(id.as_str(), &source.path, destination, Outcome::Failed)
                    .with_error(format!("copied, but failed to remove source: {}", e));
            }
        }

        info!(source = ?source.path, destination = ?placement.destination, "File organized");
        AuditEntry::new(id.as_str(), &source.path, destination, Outcome::Success)
    }

    /// Copy into a hidden staging file, verify the size, then rename into place.
    async fn copy_verified(&self, source: &Path, destination: &Path) -> Result<(), RenameError> {
        let target_dir = destination.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(target_dir).await?;

        let staging = target_dir.join(format!(".{}.partial", Uuid::new_v4()));
        let result = stage_and_commit(source, &staging, destination).await;
        if result.is_err() && fs::try_exists(&staging).await.unwrap_or(false) {
            let _ = fs::remove_file(&staging).await;
        }
        result
    }
}

async fn stage_and_commit(
    source: &Path,
    staging: &Path,
    destination: &Path,
) -> Result<(), RenameError> {
    let expected = fs::metadata(source).await?.len();

    fs::copy(source, staging).await?;
    fs::File::open(staging).await?.sync_all().await?;

    let staged = fs::metadata(staging).await?.len();
    if staged != expected {
        return Err(RenameError::VerificationFailed(format!(
            "staged copy is {} bytes, source is {}",
            staged, expected
        )));
    }

    fs::rename(staging, destination).await?;

    let written = fs::metadata(destination).await?.len();
    if written != expected {
        return Err(RenameError::VerificationFailed(format!(
            "destination is {} bytes, source is {}",
            written, expected
        )));
    }
    Ok(())
}

/// Split `name.ext` into (`name`, `.ext`); names without a dot get no extension
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// Byte-for-byte comparison, short-circuiting on length
pub async fn files_identical(a: &Path, b: &Path) -> Result<bool, RenameError> {
    let (meta_a, meta_b) = (fs::metadata(a).await?, fs::metadata(b).await?);
    if !meta_b.is_file() || meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut ra = BufReader::new(fs::File::open(a).await?);
    let mut rb = BufReader::new(fs::File::open(b).await?);
    let mut buf_a = vec![0u8; COMPARE_CHUNK];
    let mut buf_b = vec![0u8; COMPARE_CHUNK];

    loop {
        let n = ra.read(&mut buf_a).await?;
        if n == 0 {
            // Lengths matched, so b is exhausted too
            return Ok(true);
        }
        rb.read_exact(&mut buf_b[..n]).await?;
        if buf_a[..n] != buf_b[..n] {
            return Ok(false);
        }
    }
}
