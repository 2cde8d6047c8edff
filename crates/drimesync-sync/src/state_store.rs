//! Remote state store
//!
//! Persists the [`RemoteTree`] snapshot locally and publishes a copy into
//! the reserved `.SyncStateFiles` folder of the remote workspace, so a new
//! device or a reinstalled client can recover it.
//!
//! ## Design Notes
//!
//! - The snapshot is pretty-printed JSON, wrapped in the content envelope
//!   whenever the codec carries a key.
//! - Local writes go to a temporary sibling first and are renamed into
//!   place, so a crash never leaves a truncated snapshot.
//! - Recovery walks an ordered list of candidate file names; the first one
//!   that downloads and decodes wins.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use drimesync_codec::{decrypt_bytes, encrypt_bytes, PathCodec};
use drimesync_core::domain::RemoteTree;
use drimesync_core::ports::{IRemoteApi, ListQuery, UploadTarget};
use tracing::{debug, info, instrument, warn};

use crate::SyncError;

/// Receives the in-memory tree at checkpoint boundaries
///
/// The transfer executor calls this every N completed operations so that a
/// crash loses at most N operations of bookkeeping.
pub trait Checkpoint: Send + Sync {
    /// Persists `tree`
    fn checkpoint(&self, tree: &RemoteTree) -> Result<()>;
}

/// Checkpoint sink that discards everything (dry runs and tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCheckpoint;

impl Checkpoint for NoCheckpoint {
    fn checkpoint(&self, _tree: &RemoteTree) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// StateStore
// ============================================================================

/// Loads, saves, recovers and publishes the snapshot
#[derive(Debug, Clone)]
pub struct StateStore {
    /// Local snapshot file
    path: PathBuf,
    /// Codec providing the key and the remote snapshot names
    codec: Arc<PathCodec>,
}

impl StateStore {
    /// Creates a store for the snapshot at `path`
    ///
    /// # Arguments
    /// * `path` - Local snapshot file (usually `Config::snapshot_path`)
    /// * `codec` - Active path codec; its key encrypts the snapshot
    pub fn new(path: impl Into<PathBuf>, codec: Arc<PathCodec>) -> Self {
        Self {
            path: path.into(),
            codec,
        }
    }

    /// Local snapshot path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------------

    /// Serializes a tree, encrypting it when a key is configured
    pub fn encode(&self, tree: &RemoteTree) -> Result<Vec<u8>, SyncError> {
        let json = tree
            .to_json_pretty()
            .map_err(|e| SyncError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        match self.codec.key() {
            Some(key) => Ok(encrypt_bytes(&json, key)?),
            None => Ok(json),
        }
    }

    /// Parses snapshot bytes as plain JSON, then as an envelope
    ///
    /// Returns `None` when neither works, or when the snapshot was recorded
    /// under another mode.
    pub fn decode(&self, bytes: &[u8]) -> Option<RemoteTree> {
        let tree = match RemoteTree::from_json_slice(bytes) {
            Ok(tree) => tree,
            Err(_) => {
                let key = self.codec.key()?;
                let plain = decrypt_bytes(bytes, key)?;
                RemoteTree::from_json_slice(&plain).ok()?
            }
        };
        if !tree.matches_mode(self.codec.mode()) {
            warn!(
                recorded = ?tree.mode,
                active = %self.codec.mode(),
                "Snapshot belongs to another mode, ignoring it"
            );
            return None;
        }
        Some(tree)
    }

    // ------------------------------------------------------------------------
    // Local persistence
    // ------------------------------------------------------------------------

    /// Reads the local snapshot
    ///
    /// Returns `Ok(None)` when the file is missing or cannot be decoded.
    pub fn load_local(&self) -> Result<Option<RemoteTree>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read snapshot {}", self.path.display()))?;
        match self.decode(&bytes) {
            Some(tree) => {
                debug!(
                    folders = tree.folders.len(),
                    files = tree.files.len(),
                    "Local snapshot loaded"
                );
                Ok(Some(tree))
            }
            None => {
                warn!(path = %self.path.display(), "Local snapshot is unreadable, ignoring it");
                Ok(None)
            }
        }
    }

    /// Writes the snapshot atomically
    #[instrument(skip(self, tree), fields(files = tree.files.len()))]
    pub fn save(&self, tree: &RemoteTree) -> Result<()> {
        let bytes = self.encode(tree).context("Failed to encode snapshot")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let tmp_path = {
            let mut p = self.path.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };
        std::fs::write(&tmp_path, &bytes)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to move snapshot into {}", self.path.display()))?;
        debug!(bytes = bytes.len(), "Snapshot saved");
        Ok(())
    }

    /// Removes the local snapshot (force-resync)
    pub fn discard(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Local snapshot removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }

    // ------------------------------------------------------------------------
    // Remote recovery and publishing
    // ------------------------------------------------------------------------

    /// Loads the known state: local snapshot, then cloud recovery, then empty
    #[instrument(skip(self, remote))]
    pub async fn load(&self, remote: &dyn IRemoteApi, workspace_id: &str) -> Result<RemoteTree> {
        if let Some(tree) = self.load_local()? {
            return Ok(tree);
        }

        match self.recover(remote, workspace_id).await {
            Some(tree) => {
                info!(files = tree.files.len(), "Snapshot recovered from the remote workspace");
                self.save(&tree)?;
                Ok(tree)
            }
            None => {
                info!("No snapshot found, starting from an empty state");
                Ok(RemoteTree::new())
            }
        }
    }

    /// Searches the workspace for a published snapshot
    ///
    /// Candidates are tried in order and the first decodable one wins.
    pub async fn recover(&self, remote: &dyn IRemoteApi, workspace_id: &str) -> Option<RemoteTree> {
        for candidate in self.codec.snapshot_candidates() {
            if let Some(tree) = self.try_candidate(remote, workspace_id, &candidate).await {
                return Some(tree);
            }
        }
        None
    }

    async fn try_candidate(
        &self,
        remote: &dyn IRemoteApi,
        workspace_id: &str,
        name: &str,
    ) -> Option<RemoteTree> {
        let page = match remote
            .list_entries(&ListQuery::search(workspace_id, name))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                debug!(candidate = name, error = %e, "Snapshot search failed");
                return None;
            }
        };
        let entry = page
            .entries
            .into_iter()
            .find(|e| !e.is_folder() && e.name == name)?;
        let bytes = match remote.download(&entry).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(candidate = name, error = %e, "Snapshot download failed");
                return None;
            }
        };
        let tree = self.decode(&bytes);
        if tree.is_none() {
            warn!(candidate = name, "Remote snapshot could not be decoded");
        }
        tree
    }

    /// Uploads the snapshot into the reserved remote folder
    ///
    /// # Arguments
    /// * `attempts` - Maximum number of upload attempts
    /// * `delay` - Wait between attempts
    #[instrument(skip(self, remote, tree))]
    pub async fn publish(
        &self,
        remote: &dyn IRemoteApi,
        workspace_id: &str,
        tree: &RemoteTree,
        attempts: u32,
        delay: Duration,
    ) -> Result<(), SyncError> {
        let bytes = self.encode(tree)?;
        let target = UploadTarget::new(self.codec.snapshot_remote_path(), workspace_id);
        let attempts = attempts.max(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            match remote.upload_simple(&target, bytes.clone()).await {
                Ok(entry) => {
                    info!(id = %entry.id, attempt, "Snapshot published");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Snapshot publish failed");
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_error.map(SyncError::Remote).unwrap_or(SyncError::Cancelled))
    }
}

impl Checkpoint for StateStore {
    fn checkpoint(&self, tree: &RemoteTree) -> Result<()> {
        self.save(tree)
    }
}
