//! Local and remote tree models
//!
//! [`LocalTree`] is rebuilt by the scanner on every pass and never persisted.
//! [`RemoteTree`] is the engine's last-confirmed knowledge of the remote
//! workspace, keyed by the same relative paths; it is the snapshot that gets
//! saved locally and re-uploaded for recovery.
//!
//! ## Design Notes
//!
//! - Maps are `BTreeMap`/`BTreeSet` so iteration order, serialized output and
//!   therefore diff plans are deterministic.
//! - The persisted JSON shape is
//!   `{folders: {rel: {id}}, files: {rel: {id, size, fingerprint, modifiedTime}}}`.
//!   Older snapshots that used `partial_hash` and `mtime` are still accepted.
//! - A snapshot records the mode it was built under; a tree from another
//!   mode describes different remote entries and is never reused.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::mode::ConfidentialityMode;

use super::newtypes::EntryId;

// ============================================================================
// Local side
// ============================================================================

/// A file found by the scanner during the current pass
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFileEntry {
    /// `/`-separated path relative to the mirror root
    pub relative_path: String,
    /// Absolute path on the local filesystem
    pub absolute_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Modification time in seconds since the Unix epoch
    pub modified: f64,
    /// Cheap content identifier (size plus boundary samples)
    pub fingerprint: String,
}

impl LocalFileEntry {
    /// Builds the remote record for this file once it has been uploaded
    pub fn to_remote(&self, id: EntryId) -> RemoteFileEntry {
        RemoteFileEntry {
            id,
            size: self.size,
            fingerprint: self.fingerprint.clone(),
            modified: self.modified,
        }
    }
}

/// Snapshot of the local mirror root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalTree {
    /// Every non-excluded directory, as relative paths
    pub folders: BTreeSet<String>,
    /// Every non-excluded readable file, keyed by relative path
    pub files: BTreeMap<String, LocalFileEntry>,
}

impl LocalTree {
    /// Creates an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Total size in bytes of all files
    pub fn total_bytes(&self) -> u64 {
        self.files.values().map(|f| f.size).sum()
    }
}

// ============================================================================
// Remote side
// ============================================================================

/// Last-confirmed state of a remote file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFileEntry {
    /// Remote entry identifier
    pub id: EntryId,
    /// Plaintext size in bytes at upload time
    #[serde(default)]
    pub size: u64,
    /// Fingerprint of the local file at upload time
    #[serde(default, alias = "partial_hash")]
    pub fingerprint: String,
    /// Local modification time at upload time
    #[serde(default, rename = "modifiedTime", alias = "mtime")]
    pub modified: f64,
}

impl RemoteFileEntry {
    /// Returns true if the local file is considered unchanged
    pub fn matches(&self, local: &LocalFileEntry) -> bool {
        self.size == local.size && self.fingerprint == local.fingerprint
    }
}

/// Last-confirmed state of a remote folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolderEntry {
    /// Remote entry identifier
    pub id: EntryId,
}

/// The engine's known remote state ("snapshot")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteTree {
    /// Known remote folders, keyed by local relative path
    #[serde(default)]
    pub folders: BTreeMap<String, RemoteFolderEntry>,
    /// Known remote files, keyed by local relative path
    #[serde(default)]
    pub files: BTreeMap<String, RemoteFileEntry>,
    /// Mode the entries were uploaded under; absent in older snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ConfidentialityMode>,
}

impl RemoteTree {
    /// Creates an empty tree (first run)
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when nothing is known about the remote side
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Returns false if the tree was recorded under a different mode
    pub fn matches_mode(&self, mode: ConfidentialityMode) -> bool {
        self.mode.map_or(true, |recorded| recorded == mode)
    }

    /// Looks up the remote id of a folder
    pub fn folder_id(&self, path: &str) -> Option<&EntryId> {
        self.folders.get(path).map(|f| &f.id)
    }

    /// Records a folder as existing remotely
    pub fn record_folder(&mut self, path: impl Into<String>, id: EntryId) {
        self.folders.insert(path.into(), RemoteFolderEntry { id });
    }

    /// Records a file as uploaded (insert or overwrite)
    pub fn record_file(&mut self, path: impl Into<String>, entry: RemoteFileEntry) {
        self.files.insert(path.into(), entry);
    }

    /// Moves a file record to a new path, refreshing its local metadata
    ///
    /// Returns false if `old_path` was unknown.
    pub fn move_file(&mut self, old_path: &str, new_path: &str, local: &LocalFileEntry) -> bool {
        match self.files.remove(old_path) {
            Some(mut entry) => {
                entry.modified = local.modified;
                entry.fingerprint = local.fingerprint.clone();
                self.files.insert(new_path.to_string(), entry);
                true
            }
            None => false,
        }
    }

    /// Serializes the tree as pretty-printed JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Parses a tree from JSON bytes
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
