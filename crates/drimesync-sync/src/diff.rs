//! Diff engine
//!
//! Computes the [`OperationPlan`] that brings the remote workspace from the
//! known [`RemoteTree`] to the scanned [`LocalTree`].
//!
//! ## Algorithm
//!
//! 1. Folders only local are created, shallowest first; folders only known
//!    remotely are deleted, deepest first.
//! 2. Files only local are "added", files only remote are "removed".
//! 3. An added file whose fingerprint and size equal those of a removed file
//!    in the same parent folder becomes a rename. Candidates are taken in
//!    path order and the first match wins.
//! 4. Common files whose size or fingerprint changed are re-uploaded.
//! 5. Remaining added files are uploaded, remaining removed files deleted.
//!
//! Every path lands in exactly one of create, delete, rename source or
//! unchanged.

use std::collections::{BTreeSet, HashMap};

use drimesync_core::domain::{depth_of, parent_of, LocalTree, Operation, OperationPlan, RemoteTree};
use tracing::debug;

/// Computes the plan for one pass
pub fn diff(local: &LocalTree, remote: &RemoteTree) -> OperationPlan {
    let mut plan = OperationPlan::default();

    // Folders
    let mut creates: Vec<&String> = local
        .folders
        .iter()
        .filter(|path| !remote.folders.contains_key(*path))
        .collect();
    creates.sort_by(|a, b| depth_of(a).cmp(&depth_of(b)).then_with(|| a.cmp(b)));
    plan.folder_creates = creates
        .into_iter()
        .map(|path| Operation::CreateFolder { path: path.clone() })
        .collect();

    let mut folder_deletes: Vec<(&String, _)> = remote
        .folders
        .iter()
        .filter(|(path, _)| !local.folders.contains(*path))
        .collect();
    folder_deletes.sort_by(|(a, _), (b, _)| depth_of(b).cmp(&depth_of(a)).then_with(|| a.cmp(b)));
    plan.folder_deletes = folder_deletes
        .into_iter()
        .map(|(path, entry)| Operation::DeleteFolder {
            path: path.clone(),
            remote_id: entry.id.clone(),
        })
        .collect();

    // Files
    let added: Vec<&String> = local
        .files
        .keys()
        .filter(|path| !remote.files.contains_key(*path))
        .collect();
    let mut removed: BTreeSet<&String> = remote
        .files
        .keys()
        .filter(|path| !local.files.contains_key(*path))
        .collect();

    let mut removed_by_fingerprint: HashMap<&str, Vec<&String>> = HashMap::new();
    for path in &removed {
        let entry = &remote.files[*path];
        removed_by_fingerprint
            .entry(entry.fingerprint.as_str())
            .or_default()
            .push(*path);
    }

    let mut uploads = Vec::new();
    for path in added {
        let entry = &local.files[path];
        let candidate = removed_by_fingerprint
            .get_mut(entry.fingerprint.as_str())
            .and_then(|candidates| {
                let at = candidates.iter().position(|old| {
                    remote.files[*old].size == entry.size && parent_of(old) == parent_of(path)
                })?;
                Some(candidates.remove(at))
            });

        match candidate {
            Some(old_path) => {
                removed.remove(old_path);
                debug!(from = %old_path, to = %path, "Rename detected");
                plan.renames.push(Operation::RenameOrMove {
                    remote_id: remote.files[old_path].id.clone(),
                    old_path: old_path.clone(),
                    new_path: path.clone(),
                    entry: entry.clone(),
                });
            }
            None => uploads.push(Operation::CreateOrUpdateFile {
                path: path.clone(),
                entry: entry.clone(),
            }),
        }
    }

    for (path, entry) in &local.files {
        if let Some(known) = remote.files.get(path) {
            if !known.matches(entry) {
                uploads.push(Operation::CreateOrUpdateFile {
                    path: path.clone(),
                    entry: entry.clone(),
                });
            }
        }
    }
    uploads.sort_by(|a, b| a.path().cmp(b.path()));
    plan.uploads = uploads;

    plan.file_deletes = removed
        .into_iter()
        .map(|path| Operation::DeleteFile {
            path: path.clone(),
            remote_id: remote.files[path].id.clone(),
        })
        .collect();

    debug!(
        folder_creates = plan.folder_creates.len(),
        renames = plan.renames.len(),
        file_deletes = plan.file_deletes.len(),
        folder_deletes = plan.folder_deletes.len(),
        uploads = plan.uploads.len(),
        "Plan computed"
    );
    plan
}
