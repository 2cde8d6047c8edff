//! Operations and operation plans
//!
//! The diff engine produces one [`OperationPlan`] per pass; the transfer
//! executor consumes each [`Operation`] exactly once.

use std::fmt::{self, Display, Formatter};

use super::newtypes::EntryId;
use super::tree::LocalFileEntry;

/// A single remote mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a folder that exists locally but not remotely
    CreateFolder {
        /// Relative path of the folder
        path: String,
    },
    /// Delete a remote folder that no longer exists locally
    DeleteFolder {
        /// Relative path of the folder (for bookkeeping and reporting)
        path: String,
        /// Remote id of the folder
        remote_id: EntryId,
    },
    /// Upload a new file or overwrite a changed one
    CreateOrUpdateFile {
        /// Relative path of the file
        path: String,
        /// Local file to upload
        entry: LocalFileEntry,
    },
    /// Delete a remote file that no longer exists locally
    DeleteFile {
        /// Relative path of the file (for bookkeeping and reporting)
        path: String,
        /// Remote id of the file
        remote_id: EntryId,
    },
    /// Rename a remote entry in place instead of delete + upload
    RenameOrMove {
        /// Remote id of the entry being renamed
        remote_id: EntryId,
        /// Relative path the remote entry was known under
        old_path: String,
        /// Relative path it must be known under after the pass
        new_path: String,
        /// Local file at the new path (used for the upload fallback)
        entry: LocalFileEntry,
    },
}

impl Operation {
    /// The relative path this operation is attributed to in reports
    pub fn path(&self) -> &str {
        match self {
            Operation::CreateFolder { path }
            | Operation::DeleteFolder { path, .. }
            | Operation::CreateOrUpdateFile { path, .. }
            | Operation::DeleteFile { path, .. } => path,
            Operation::RenameOrMove { new_path, .. } => new_path,
        }
    }

    /// Short name of the operation kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            Operation::CreateFolder { .. } => "create_folder",
            Operation::DeleteFolder { .. } => "delete_folder",
            Operation::CreateOrUpdateFile { .. } => "upload",
            Operation::DeleteFile { .. } => "delete_file",
            Operation::RenameOrMove { .. } => "rename",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateFolder { path } => write!(f, "create folder {path}"),
            Operation::DeleteFolder { path, remote_id } => {
                write!(f, "delete folder {path} (id {remote_id})")
            }
            Operation::CreateOrUpdateFile { path, entry } => {
                write!(f, "upload {path} ({} bytes)", entry.size)
            }
            Operation::DeleteFile { path, remote_id } => {
                write!(f, "delete file {path} (id {remote_id})")
            }
            Operation::RenameOrMove {
                old_path, new_path, ..
            } => write!(f, "rename {old_path} -> {new_path}"),
        }
    }
}

/// Ordered operation set for one pass
///
/// Order: folder creates (ascending depth), renames, file deletes, folder
/// deletes (descending depth), uploads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationPlan {
    /// Folders to create, parents before children
    pub folder_creates: Vec<Operation>,
    /// In-place renames
    pub renames: Vec<Operation>,
    /// Files to delete
    pub file_deletes: Vec<Operation>,
    /// Folders to delete, children before parents
    pub folder_deletes: Vec<Operation>,
    /// Files to upload
    pub uploads: Vec<Operation>,
}

impl OperationPlan {
    /// Returns true if the pass has nothing to do
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of operations
    pub fn len(&self) -> usize {
        self.folder_creates.len()
            + self.renames.len()
            + self.file_deletes.len()
            + self.folder_deletes.len()
            + self.uploads.len()
    }

    /// Iterates all operations in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.folder_creates
            .iter()
            .chain(self.renames.iter())
            .chain(self.file_deletes.iter())
            .chain(self.folder_deletes.iter())
            .chain(self.uploads.iter())
    }

    /// Bytes the uploads of this plan will send (plaintext sizes)
    pub fn upload_bytes(&self) -> u64 {
        self.uploads
            .iter()
            .map(|op| match op {
                Operation::CreateOrUpdateFile { entry, .. } => entry.size,
                _ => 0,
            })
            .sum()
    }
}
