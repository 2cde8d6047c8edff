//! Local tree scanner
//!
//! Walks the mirror root depth-first without following symlinks. Excluded
//! directories are pruned before descent. Entries that cannot be read are
//! logged and skipped so one bad file never aborts the scan.

use std::path::Path;
use std::time::UNIX_EPOCH;

use drimesync_core::domain::{LocalFileEntry, LocalTree};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::exclusions::ExclusionSet;
use crate::fingerprint::fingerprint_file;
use crate::SyncError;

/// Scans `root` into a [`LocalTree`]
///
/// This is blocking filesystem work; async callers should run it on
/// `spawn_blocking`.
///
/// # Errors
/// Returns [`SyncError::LocalRootUnreadable`] if `root` is not a readable
/// directory. Errors below the root are logged and skipped.
#[instrument(skip(exclusions), fields(root = %root.display()))]
pub fn scan(root: &Path, exclusions: &ExclusionSet) -> Result<LocalTree, SyncError> {
    if !root.is_dir() || std::fs::read_dir(root).is_err() {
        return Err(SyncError::LocalRootUnreadable(root.to_path_buf()));
    }

    let mut tree = LocalTree::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| match relative_path(root, entry.path()) {
            Some(rel) => !exclusions.is_excluded(&rel, entry.file_type().is_dir()),
            None => false,
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let Some(rel) = relative_path(root, entry.path()) else {
            warn!(path = %entry.path().display(), "Skipping entry with a non UTF-8 name");
            continue;
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            tree.folders.insert(rel);
            continue;
        }
        if !file_type.is_file() {
            debug!(path = %rel, "Skipping special file or symlink");
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %rel, error = %e, "Cannot stat file, skipping");
                continue;
            }
        };
        let size = metadata.len();
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let fingerprint = match fingerprint_file(entry.path(), size) {
            Ok(fp) => fp,
            Err(e) => {
                warn!(path = %rel, error = %e, "Cannot read file, skipping");
                continue;
            }
        };

        tree.files.insert(
            rel.clone(),
            LocalFileEntry {
                relative_path: rel,
                absolute_path: entry.path().to_path_buf(),
                size,
                modified,
                fingerprint,
            },
        );
    }

    info!(
        folders = tree.folders.len(),
        files = tree.files.len(),
        bytes = tree.total_bytes(),
        "Local scan complete"
    );
    Ok(tree)
}

/// `/`-separated path of `path` relative to `root`
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    let joined = parts?.join("/");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
