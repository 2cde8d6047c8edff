//! Remote API port (driven/secondary port)
//!
//! This module defines the interface through which the mirror engine talks
//! to the remote cloud workspace. The production implementation targets the
//! Drime REST API, but the engine only sees these operations and DTOs.
//!
//! ## Design Notes
//!
//! - Returns [`RemoteError`] rather than `anyhow::Error`: the executor
//!   branches on the error kind (retry vs. abort the item), so the
//!   classification is part of the contract.
//! - Uses `#[async_trait]` for async trait methods.
//! - Multipart upload is exposed as its primitive steps so the executor can
//!   poll cancellation between parts.

use serde::{Deserialize, Serialize};

use crate::domain::errors::RemoteError;
use crate::domain::newtypes::EntryId;

// ============================================================================
// Entry DTOs
// ============================================================================

/// Kind of a remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// A directory
    Folder,
    /// Anything else (the API reports file subtypes such as `image`, `text`)
    File,
}

/// A file or folder as reported by the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Entry identifier
    pub id: EntryId,
    /// Remote-visible name (possibly encrypted)
    pub name: String,
    /// Folder or file
    pub entry_type: EntryType,
    /// Content hash used to build download URLs (files only)
    pub hash: Option<String>,
    /// Parent folder id, `None` at the workspace root
    pub parent_id: Option<EntryId>,
    /// Stored size in bytes
    pub size: Option<u64>,
}

impl RemoteEntry {
    /// Returns true if the entry is a folder
    pub fn is_folder(&self) -> bool {
        self.entry_type == EntryType::Folder
    }
}

/// Parameters of a listing request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Folder to list, `None` for the workspace root
    pub folder_id: Option<EntryId>,
    /// Target workspace (`"0"` is the personal workspace)
    pub workspace_id: String,
    /// Optional name filter
    pub query: Option<String>,
    /// 1-based page number
    pub page: u32,
}

impl ListQuery {
    /// First page of the workspace root
    pub fn root(workspace_id: impl Into<String>) -> Self {
        Self {
            folder_id: None,
            workspace_id: workspace_id.into(),
            query: None,
            page: 1,
        }
    }

    /// First page of a folder
    pub fn folder(workspace_id: impl Into<String>, folder_id: Option<EntryId>) -> Self {
        Self {
            folder_id,
            ..Self::root(workspace_id)
        }
    }

    /// Workspace-wide name search
    pub fn search(workspace_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            query: Some(name.into()),
            ..Self::root(workspace_id)
        }
    }
}

/// One page of listing results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPage {
    /// Entries on this page
    pub entries: Vec<RemoteEntry>,
    /// Page number of this page
    pub current_page: u32,
    /// Last available page, if the remote reports it
    pub last_page: Option<u32>,
}

impl EntryPage {
    /// Returns true if a further page exists
    pub fn has_more(&self) -> bool {
        self.last_page.is_some_and(|last| self.current_page < last)
    }
}

// ============================================================================
// Upload DTOs
// ============================================================================

/// Where an uploaded file lands in the remote workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Remote-visible file name (last segment of `relative_path`)
    pub file_name: String,
    /// Remote-visible relative path, `/`-separated
    pub relative_path: String,
    /// Target workspace
    pub workspace_id: String,
}

impl UploadTarget {
    /// Builds a target from an encoded remote path
    pub fn new(remote_path: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        let relative_path = remote_path.into();
        let file_name = relative_path
            .rsplit_once('/')
            .map_or(relative_path.as_str(), |(_, name)| name)
            .to_string();
        Self {
            file_name,
            relative_path,
            workspace_id: workspace_id.into(),
        }
    }
}

/// An initialized multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartSession {
    /// Upload identifier issued by the object store
    pub upload_id: String,
    /// Object key the parts are assembled under
    pub key: String,
}

/// A pre-signed URL for one part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPart {
    /// 1-based part number
    pub part_number: u32,
    /// Absolute URL accepting a PUT of the part bytes
    pub url: String,
}

/// A part that was accepted by the object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// 1-based part number
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// ETag returned by the PUT, quotes stripped
    #[serde(rename = "ETag")]
    pub etag: String,
}

// ============================================================================
// IRemoteApi trait
// ============================================================================

/// Port trait for remote workspace operations
///
/// ## Implementation Notes
///
/// - Implementations must map transport failures to [`RemoteError::Network`]
///   and HTTP 401/403 to [`RemoteError::Auth`], distinct from other 4xx/5xx.
/// - Implementations do not retry; retry policy belongs to the executor.
#[async_trait::async_trait]
pub trait IRemoteApi: Send + Sync {
    /// Lists entries of a folder or searches the workspace by name
    async fn list_entries(&self, query: &ListQuery) -> Result<EntryPage, RemoteError>;

    /// Creates a folder
    ///
    /// # Arguments
    /// * `name` - Remote-visible folder name
    /// * `parent_id` - Parent folder, `None` for the workspace root
    /// * `workspace_id` - Target workspace
    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&EntryId>,
        workspace_id: &str,
    ) -> Result<RemoteEntry, RemoteError>;

    /// Renames an entry in place (metadata only)
    async fn rename_entry(&self, id: &EntryId, new_name: &str) -> Result<RemoteEntry, RemoteError>;

    /// Deletes entries, permanently when `permanent` is true
    async fn delete_entries(&self, ids: &[EntryId], permanent: bool) -> Result<(), RemoteError>;

    /// Uploads a file in a single request
    async fn upload_simple(
        &self,
        target: &UploadTarget,
        data: Vec<u8>,
    ) -> Result<RemoteEntry, RemoteError>;

    /// Starts a multipart upload of `size` bytes
    async fn multipart_init(
        &self,
        target: &UploadTarget,
        size: u64,
    ) -> Result<MultipartSession, RemoteError>;

    /// Requests pre-signed URLs for a batch of part numbers
    async fn multipart_sign(
        &self,
        session: &MultipartSession,
        part_numbers: &[u32],
    ) -> Result<Vec<SignedPart>, RemoteError>;

    /// Uploads one part to its pre-signed URL and returns the ETag
    async fn put_part(&self, url: &str, data: Vec<u8>) -> Result<String, RemoteError>;

    /// Completes a multipart upload and returns the created file entry
    async fn multipart_complete(
        &self,
        session: &MultipartSession,
        target: &UploadTarget,
        size: u64,
        parts: &[CompletedPart],
    ) -> Result<RemoteEntry, RemoteError>;

    /// Downloads the full content of a file entry
    async fn download(&self, entry: &RemoteEntry) -> Result<Vec<u8>, RemoteError>;
}
