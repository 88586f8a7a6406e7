//! Candidate file discovery

use crate::extractor::SourceFile;
use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Absolute form of `path` without touching the filesystem
pub fn absolute(path: &Path) -> PathBuf {
    path.absolutize()
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_path_buf())
}

/// List media files under `dir`, sorted by path.
///
/// `extensions` must be lowercase without leading dots. Hidden files
/// (including staged `.partial` copies) are ignored.
pub fn scan_directory(dir: &Path, recursive: bool, extensions: &[String]) -> Result<Vec<SourceFile>> {
    let root = absolute(dir);
    if !root.is_dir() {
        anyhow::bail!("Directory {:?} does not exist", root);
    }

    let walker = WalkDir::new(&root)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry while scanning {:?}", root);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| extensions.iter().any(|x| *x == e));
        if matches {
            files.push(SourceFile::new(entry.path()));
        }
    }

    debug!(dir = ?root, count = files.len(), "Scan complete");
    Ok(files)
}

/// Scan and attach context for the caller's log line
pub fn scan_checked(dir: &Path, recursive: bool, extensions: &[String]) -> Result<Vec<SourceFile>> {
    scan_directory(dir, recursive, extensions)
        .with_context(|| format!("Failed to scan {:?}", dir))
}
