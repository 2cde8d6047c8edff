//! Transfer executor
//!
//! Applies an [`OperationPlan`] to the remote workspace and keeps the
//! in-memory [`RemoteTree`] in step with every confirmed operation.
//!
//! ## Execution order
//!
//! 1. Folder creations, sequentially, parents before children
//! 2. Renames, on the worker pool (a rejected rename falls back to upload
//!    plus delete)
//! 3. Deletions, files then folders, in batches of [`DELETE_BATCH_SIZE`]
//! 4. Uploads, on the worker pool
//!
//! ## Concurrency
//!
//! `workers` tasks drain one shared queue. Workers never touch the tree:
//! each finished job is sent over a channel to a single consumer, which
//! updates the tree, the report and the checkpoint counter. Simple uploads
//! additionally hold a permit of the executor's own upload limiter.
//!
//! ## Retry Logic
//!
//! Retryable remote errors (network, 5xx) are retried with exponential
//! backoff: folder and delete calls up to [`CALL_ATTEMPTS`] times, file
//! uploads up to `file_attempts` times. Auth, client and crypto failures
//! are final for the item.

use std::collections::VecDeque;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use drimesync_codec::{encrypt_file, PathCodec};
use drimesync_core::config::Config;
use drimesync_core::domain::{
    EntryId, ExecutionReport, FailureKind, LocalFileEntry, Operation, OperationPlan, PassStatus,
    RemoteError, RemoteFileEntry, RemoteTree,
};
use drimesync_core::ports::{IRemoteApi, ISyncObserver, ListQuery, LogLevel, UploadTarget};
use tempfile::NamedTempFile;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, instrument, warn};

use crate::control::TransferControl;
use crate::multipart::{upload_multipart, MultipartSettings};
use crate::progress::ProgressTracker;
use crate::state_store::Checkpoint;
use crate::SyncError;

/// Remote ids per delete call
pub const DELETE_BATCH_SIZE: usize = 50;

/// Attempts for folder, rename and delete calls
pub const CALL_ATTEMPTS: u32 = 3;

/// Pages scanned when adopting an existing folder
const MAX_ADOPTION_PAGES: u32 = 100;

/// Successful operations between two checkpoints
///
/// Small passes checkpoint often; very large passes checkpoint coarsely to
/// bound the number of snapshot writes.
pub fn checkpoint_interval(total_ops: usize) -> usize {
    match total_ops {
        n if n > 10_000 => 1_000,
        n if n > 2_000 => 200,
        n if n > 200 => 50,
        _ => 5,
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Executor parameters for one pass
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Target remote workspace
    pub workspace_id: String,
    /// Worker pool size
    pub workers: usize,
    /// Concurrent single-request uploads
    pub simple_upload_concurrency: usize,
    /// Payloads above this size use multipart upload
    pub multipart_threshold: u64,
    /// Multipart chunking and part retries
    pub multipart: MultipartSettings,
    /// Attempts for a whole file upload
    pub file_attempts: u32,
    /// First backoff delay; doubles on each retry
    pub retry_base_delay: Duration,
    /// Directory for sealed ciphertext copies, the system temp dir if unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl TransferSettings {
    /// Derives the settings from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            workspace_id: config.mirror.workspace_id.clone(),
            workers: config.transfer.workers.max(1),
            simple_upload_concurrency: config.simple_upload_concurrency().max(1),
            multipart_threshold: config.multipart_threshold_bytes(),
            multipart: MultipartSettings {
                chunk_size: config.chunk_size_bytes(),
                sign_batch_size: config.transfer.sign_batch_size.max(1),
                part_retries: config.transfer.part_retries,
                retry_unit: Duration::from_secs(1),
            },
            file_attempts: config.transfer.file_attempts.max(1),
            retry_base_delay: Duration::from_secs(1),
            temp_dir: config.transfer.temp_dir.clone(),
        }
    }
}

/// Retries `f` on retryable remote errors with exponential backoff
///
/// No attempt is started once `control` is cancelled.
async fn with_retry<F, Fut, T>(
    operation_name: &str,
    attempts: u32,
    base_delay: Duration,
    control: &TransferControl,
    f: F,
) -> Result<T, RemoteError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < attempts && !control.is_cancelled() => {
                let delay = base_delay * 2u32.pow(attempt - 1);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                if control.is_cancelled() {
                    return Err(RemoteError::Cancelled);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// Jobs and outcomes
// ============================================================================

/// Unit of work pulled from the shared queue
#[derive(Debug, Clone)]
enum Job {
    Upload {
        path: String,
        entry: LocalFileEntry,
    },
    Rename {
        remote_id: EntryId,
        old_path: String,
        new_path: String,
        entry: LocalFileEntry,
    },
}

impl Job {
    fn from_operation(op: &Operation) -> Option<Self> {
        match op {
            Operation::CreateOrUpdateFile { path, entry } => Some(Job::Upload {
                path: path.clone(),
                entry: entry.clone(),
            }),
            Operation::RenameOrMove {
                remote_id,
                old_path,
                new_path,
                entry,
            } => Some(Job::Rename {
                remote_id: remote_id.clone(),
                old_path: old_path.clone(),
                new_path: new_path.clone(),
                entry: entry.clone(),
            }),
            _ => None,
        }
    }

    fn path(&self) -> &str {
        match self {
            Job::Upload { path, .. } => path,
            Job::Rename { new_path, .. } => new_path,
        }
    }
}

/// Result of one job, applied to the tree by the consumer
#[derive(Debug)]
enum Outcome {
    Uploaded {
        path: String,
        entry: RemoteFileEntry,
        bytes: u64,
    },
    Renamed {
        old_path: String,
        new_path: String,
        local: LocalFileEntry,
    },
    /// Rename rejected; the file was uploaded under the new path instead
    Replaced {
        old_path: String,
        new_path: String,
        entry: RemoteFileEntry,
        bytes: u64,
        old_deleted: bool,
    },
    Failed {
        path: String,
        kind: FailureKind,
        message: String,
    },
}

impl Outcome {
    fn failed(path: &str, err: &SyncError) -> Self {
        Outcome::Failed {
            path: path.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Counts successes and fires the checkpoint every `interval`
struct CheckpointTicker {
    interval: usize,
    successes: usize,
}

impl CheckpointTicker {
    fn tick(&mut self, tree: &RemoteTree, checkpoint: &dyn Checkpoint) {
        self.successes += 1;
        if self.successes % self.interval == 0 {
            match checkpoint.checkpoint(tree) {
                Ok(()) => debug!(successes = self.successes, "Checkpoint written"),
                Err(e) => warn!(error = %e, "Checkpoint failed"),
            }
        }
    }
}

// ============================================================================
// Worker context
// ============================================================================

/// Everything a worker task needs, shared behind an `Arc`
struct WorkerContext {
    remote: Arc<dyn IRemoteApi>,
    codec: Arc<PathCodec>,
    settings: TransferSettings,
    control: Arc<TransferControl>,
    upload_limiter: Arc<Semaphore>,
    progress: Arc<ProgressTracker>,
    observer: Arc<dyn ISyncObserver>,
}

/// Bytes actually sent for a file: the original or a sealed temporary copy
enum Payload {
    Original(PathBuf),
    Sealed(NamedTempFile),
}

impl Payload {
    fn path(&self) -> &std::path::Path {
        match self {
            Payload::Original(path) => path,
            Payload::Sealed(file) => file.path(),
        }
    }
}

impl WorkerContext {
    async fn run(&self, job: Job) -> Outcome {
        if !self.control.wait_if_paused().await {
            return Outcome::failed(job.path(), &SyncError::Cancelled);
        }
        match job {
            Job::Upload { path, entry } => match self.upload(&path, &entry).await {
                Ok(remote_entry) => {
                    self.observer
                        .log(LogLevel::Success, &format!("Uploaded {}", path));
                    Outcome::Uploaded {
                        path,
                        entry: remote_entry,
                        bytes: entry.size,
                    }
                }
                Err(e) => self.fail(&path, e),
            },
            Job::Rename {
                remote_id,
                old_path,
                new_path,
                entry,
            } => self.rename(remote_id, old_path, new_path, entry).await,
        }
    }

    fn fail(&self, path: &str, err: SyncError) -> Outcome {
        if !matches!(err, SyncError::Cancelled) {
            warn!(path = %path, error = %err, "Item failed");
            self.observer
                .log(LogLevel::Error, &format!("Failed {}: {}", path, err));
        }
        Outcome::failed(path, &err)
    }

    async fn rename(
        &self,
        remote_id: EntryId,
        old_path: String,
        new_path: String,
        entry: LocalFileEntry,
    ) -> Outcome {
        let new_name = self.codec.remote_leaf_name(&new_path, false);
        let renamed = with_retry(
            "rename_entry",
            CALL_ATTEMPTS,
            self.settings.retry_base_delay,
            &self.control,
            || self.remote.rename_entry(&remote_id, &new_name),
        )
        .await;

        match renamed {
            Ok(_) => {
                self.observer.log(
                    LogLevel::Success,
                    &format!("Renamed {} -> {}", old_path, new_path),
                );
                Outcome::Renamed {
                    old_path,
                    new_path,
                    local: entry,
                }
            }
            Err(err) => {
                warn!(from = %old_path, to = %new_path, error = %err, "Rename rejected, uploading instead");
                let uploaded = match self.upload(&new_path, &entry).await {
                    Ok(uploaded) => uploaded,
                    Err(e) => return self.fail(&new_path, e),
                };
                let old_deleted = match with_retry(
                    "delete_entries",
                    CALL_ATTEMPTS,
                    self.settings.retry_base_delay,
                    &self.control,
                    || self.remote.delete_entries(std::slice::from_ref(&remote_id), true),
                )
                .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(path = %old_path, error = %e, "Could not delete the previous entry");
                        false
                    }
                };
                Outcome::Replaced {
                    old_path,
                    new_path,
                    entry: uploaded,
                    bytes: entry.size,
                    old_deleted,
                }
            }
        }
    }

    /// Uploads one file with file-level retries
    async fn upload(&self, path: &str, entry: &LocalFileEntry) -> Result<RemoteFileEntry, SyncError> {
        let attempts = self.settings.file_attempts.max(1);
        let mut attempt = 1;
        loop {
            if self.control.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            match self.upload_once(path, entry).await {
                Ok(id) => return Ok(entry.to_remote(id)),
                Err(err)
                    if err.is_retryable() && attempt < attempts && !self.control.is_cancelled() =>
                {
                    let delay = self.settings.retry_base_delay * 2u32.pow(attempt - 1);
                    warn!(path = %path, attempt, error = %err, "Upload failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn upload_once(&self, path: &str, entry: &LocalFileEntry) -> Result<EntryId, SyncError> {
        let target = UploadTarget::new(
            self.codec.encode_path(path, false),
            self.settings.workspace_id.clone(),
        );
        let payload = self.prepare_payload(entry).await?;
        let size = tokio::fs::metadata(payload.path()).await?.len();

        let remote_entry = if size > self.settings.multipart_threshold {
            upload_multipart(
                self.remote.as_ref(),
                &target,
                payload.path(),
                entry.size,
                &self.settings.multipart,
                &self.control,
                &self.progress,
                path,
            )
            .await?
        } else {
            let _permit = self
                .upload_limiter
                .acquire()
                .await
                .map_err(|_| SyncError::Cancelled)?;
            let data = tokio::fs::read(payload.path()).await?;
            let uploaded = self.remote.upload_simple(&target, data).await?;
            self.progress.add_bytes(path, entry.size);
            uploaded
        };

        debug!(path = %path, id = %remote_entry.id, size, "File uploaded");
        Ok(remote_entry.id)
    }

    /// Seals the file into a temporary copy when content is encrypted
    ///
    /// The temporary file is removed when the payload is dropped, whatever
    /// the outcome of the upload.
    async fn prepare_payload(&self, entry: &LocalFileEntry) -> Result<Payload, SyncError> {
        let Some(key) = self.codec.content_key().cloned() else {
            return Ok(Payload::Original(entry.absolute_path.clone()));
        };
        let source = entry.absolute_path.clone();
        let temp_dir = self.settings.temp_dir.clone();
        let sealed = tokio::task::spawn_blocking(move || -> Result<NamedTempFile, SyncError> {
            let ciphertext = encrypt_file(&source, &key)?;
            let mut tmp = match temp_dir {
                Some(dir) => NamedTempFile::new_in(dir)?,
                None => NamedTempFile::new()?,
            };
            tmp.write_all(&ciphertext)?;
            tmp.flush()?;
            Ok(tmp)
        })
        .await
        .map_err(|e| SyncError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        Ok(Payload::Sealed(sealed))
    }
}

async fn worker(
    ctx: Arc<WorkerContext>,
    queue: Arc<Mutex<VecDeque<Job>>>,
    tx: mpsc::UnboundedSender<Outcome>,
) {
    loop {
        let job = match queue.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(_) => None,
        };
        let Some(job) = job else { break };

        let outcome = if ctx.control.is_cancelled() {
            Outcome::failed(job.path(), &SyncError::Cancelled)
        } else {
            ctx.run(job).await
        };
        if tx.send(outcome).is_err() {
            break;
        }
    }
}

// ============================================================================
// TransferExecutor
// ============================================================================

/// Applies operation plans against the remote workspace
pub struct TransferExecutor {
    remote: Arc<dyn IRemoteApi>,
    codec: Arc<PathCodec>,
    settings: TransferSettings,
    control: Arc<TransferControl>,
    observer: Arc<dyn ISyncObserver>,
    /// Limits concurrent single-request uploads, independent of the pool size
    upload_limiter: Arc<Semaphore>,
}

impl TransferExecutor {
    /// Creates an executor
    ///
    /// # Arguments
    /// * `remote` - Remote API port
    /// * `codec` - Path codec for the active mode
    /// * `settings` - Pool size, thresholds and retry parameters
    /// * `control` - Pause and cancellation flags shared with the caller
    /// * `observer` - Receiver of log lines and progress
    pub fn new(
        remote: Arc<dyn IRemoteApi>,
        codec: Arc<PathCodec>,
        settings: TransferSettings,
        control: Arc<TransferControl>,
        observer: Arc<dyn ISyncObserver>,
    ) -> Self {
        let upload_limiter = Arc::new(Semaphore::new(settings.simple_upload_concurrency.max(1)));
        Self {
            remote,
            codec,
            settings,
            control,
            observer,
            upload_limiter,
        }
    }

    /// Current settings
    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    /// Executes `plan`, updating `tree` with every confirmed operation
    ///
    /// Per-item failures are recorded in the report and never abort the
    /// pass. The caller is responsible for the final save of `tree`.
    #[instrument(skip_all, fields(ops = plan.len(), workers = self.settings.workers))]
    pub async fn execute(
        &self,
        plan: &OperationPlan,
        tree: &mut RemoteTree,
        checkpoint: &dyn Checkpoint,
    ) -> ExecutionReport {
        let started = Instant::now();
        let mut report = ExecutionReport::new(Utc::now());
        report.planned = plan.len() as u64;

        let progress = Arc::new(ProgressTracker::new(
            plan.upload_bytes(),
            plan.len() as u64,
            Arc::clone(&self.observer),
        ));
        let mut ticker = CheckpointTicker {
            interval: checkpoint_interval(plan.len()),
            successes: 0,
        };

        self.create_folders(&plan.folder_creates, tree, &mut report, &progress, &mut ticker, checkpoint)
            .await;
        self.run_pool(&plan.renames, tree, &mut report, &progress, &mut ticker, checkpoint)
            .await;
        self.delete_batches(&plan.file_deletes, tree, &mut report, &progress, &mut ticker, checkpoint)
            .await;
        self.delete_batches(&plan.folder_deletes, tree, &mut report, &progress, &mut ticker, checkpoint)
            .await;
        self.run_pool(&plan.uploads, tree, &mut report, &progress, &mut ticker, checkpoint)
            .await;

        if self.control.is_cancelled() {
            report.status = PassStatus::Cancelled;
        }
        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            succeeded = report.succeeded,
            renamed = report.renamed,
            deleted = report.deleted,
            failed = report.failed,
            bytes = report.bytes_transferred,
            "Plan executed"
        );
        report
    }

    // ------------------------------------------------------------------------
    // Folders
    // ------------------------------------------------------------------------

    async fn create_folders(
        &self,
        ops: &[Operation],
        tree: &mut RemoteTree,
        report: &mut ExecutionReport,
        progress: &ProgressTracker,
        ticker: &mut CheckpointTicker,
        checkpoint: &dyn Checkpoint,
    ) {
        for op in ops {
            let Operation::CreateFolder { path } = op else { continue };
            if !self.control.wait_if_paused().await {
                report.record_failure(path.clone(), FailureKind::Cancelled, "cancelled");
                continue;
            }
            match self.ensure_folder(path, tree).await {
                Ok(id) => {
                    debug!(path = %path, id = %id, "Folder ready");
                    report.succeeded += 1;
                    ticker.tick(tree, checkpoint);
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Folder creation failed");
                    self.observer
                        .log(LogLevel::Error, &format!("Failed folder {}: {}", path, e));
                    report.record_failure(path.clone(), e.kind(), e.to_string());
                }
            }
            progress.complete_op(path);
        }
    }

    /// Creates `path` and any missing ancestor, returning the folder id
    async fn ensure_folder(&self, path: &str, tree: &mut RemoteTree) -> Result<EntryId, RemoteError> {
        let segments: Vec<&str> = path.split('/').collect();
        let mut parent_id: Option<EntryId> = None;

        for depth in 0..segments.len() {
            let prefix = segments[..=depth].join("/");
            if let Some(id) = tree.folder_id(&prefix) {
                parent_id = Some(id.clone());
                continue;
            }

            let name = self.codec.encode_folder_name(segments[depth]);
            let ws = self.settings.workspace_id.as_str();
            let created = with_retry(
                "create_folder",
                CALL_ATTEMPTS,
                self.settings.retry_base_delay,
                &self.control,
                || self.remote.create_folder(&name, parent_id.as_ref(), ws),
            )
            .await;

            let id = match created {
                Ok(entry) => entry.id,
                Err(err @ RemoteError::Client { .. }) => {
                    match self.find_existing_folder(&name, parent_id.as_ref()).await? {
                        Some(id) => {
                            info!(path = %prefix, id = %id, "Adopted existing remote folder");
                            id
                        }
                        None => return Err(err),
                    }
                }
                Err(err) => return Err(err),
            };
            tree.record_folder(prefix, id.clone());
            parent_id = Some(id);
        }

        parent_id.ok_or_else(|| RemoteError::InvalidResponse(format!("empty folder path '{path}'")))
    }

    /// Looks for a folder called `name` under `parent_id`
    async fn find_existing_folder(
        &self,
        name: &str,
        parent_id: Option<&EntryId>,
    ) -> Result<Option<EntryId>, RemoteError> {
        let mut query = ListQuery::folder(self.settings.workspace_id.clone(), parent_id.cloned());
        while query.page <= MAX_ADOPTION_PAGES {
            let page = self.remote.list_entries(&query).await?;
            if let Some(found) = page
                .entries
                .iter()
                .find(|e| e.is_folder() && e.name == name)
            {
                return Ok(Some(found.id.clone()));
            }
            if !page.has_more() {
                break;
            }
            query.page += 1;
        }
        Ok(None)
    }

    // ------------------------------------------------------------------------
    // Deletes
    // ------------------------------------------------------------------------

    async fn delete_batches(
        &self,
        ops: &[Operation],
        tree: &mut RemoteTree,
        report: &mut ExecutionReport,
        progress: &ProgressTracker,
        ticker: &mut CheckpointTicker,
        checkpoint: &dyn Checkpoint,
    ) {
        for batch in ops.chunks(DELETE_BATCH_SIZE) {
            let items: Vec<(&str, &EntryId, bool)> = batch
                .iter()
                .filter_map(|op| match op {
                    Operation::DeleteFile { path, remote_id } => Some((path.as_str(), remote_id, false)),
                    Operation::DeleteFolder { path, remote_id } => Some((path.as_str(), remote_id, true)),
                    _ => None,
                })
                .collect();

            if !self.control.wait_if_paused().await {
                for (path, _, _) in &items {
                    report.record_failure(*path, FailureKind::Cancelled, "cancelled");
                }
                continue;
            }

            let ids: Vec<EntryId> = items.iter().map(|(_, id, _)| (*id).clone()).collect();
            let result = with_retry(
                "delete_entries",
                CALL_ATTEMPTS,
                self.settings.retry_base_delay,
                &self.control,
                || self.remote.delete_entries(&ids, true),
            )
            .await;

            match result {
                Ok(()) => {
                    for (path, _, is_folder) in &items {
                        if *is_folder {
                            tree.folders.remove(*path);
                        } else {
                            tree.files.remove(*path);
                        }
                        report.deleted += 1;
                        progress.complete_op(path);
                        ticker.tick(tree, checkpoint);
                    }
                    self.observer
                        .log(LogLevel::Info, &format!("Deleted {} remote entries", items.len()));
                }
                Err(e) => {
                    warn!(count = items.len(), error = %e, "Delete batch failed");
                    for (path, _, _) in &items {
                        report.record_failure(*path, e.kind(), e.to_string());
                        progress.complete_op(path);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Worker pool
    // ------------------------------------------------------------------------

    async fn run_pool(
        &self,
        ops: &[Operation],
        tree: &mut RemoteTree,
        report: &mut ExecutionReport,
        progress: &Arc<ProgressTracker>,
        ticker: &mut CheckpointTicker,
        checkpoint: &dyn Checkpoint,
    ) {
        let jobs: VecDeque<Job> = ops.iter().filter_map(Job::from_operation).collect();
        if jobs.is_empty() {
            return;
        }

        let worker_count = self.settings.workers.max(1).min(jobs.len());
        let ctx = Arc::new(WorkerContext {
            remote: Arc::clone(&self.remote),
            codec: Arc::clone(&self.codec),
            settings: self.settings.clone(),
            control: Arc::clone(&self.control),
            upload_limiter: Arc::clone(&self.upload_limiter),
            progress: Arc::clone(progress),
            observer: Arc::clone(&self.observer),
        });
        let queue = Arc::new(Mutex::new(jobs));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handles: Vec<_> = (0..worker_count)
            .map(|_| tokio::spawn(worker(Arc::clone(&ctx), Arc::clone(&queue), tx.clone())))
            .collect();
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            let path = apply_outcome(outcome, tree, report);
            if let Some(path) = path {
                progress.complete_op(&path);
                ticker.tick(tree, checkpoint);
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Transfer worker panicked");
            }
        }
    }
}

/// Applies one outcome to the tree and report
///
/// Returns the path of a successful outcome, `None` for failures.
fn apply_outcome(outcome: Outcome, tree: &mut RemoteTree, report: &mut ExecutionReport) -> Option<String> {
    match outcome {
        Outcome::Uploaded { path, entry, bytes } => {
            tree.record_file(path.clone(), entry);
            report.succeeded += 1;
            report.bytes_transferred += bytes;
            Some(path)
        }
        Outcome::Renamed {
            old_path,
            new_path,
            local,
        } => {
            tree.move_file(&old_path, &new_path, &local);
            report.renamed += 1;
            Some(new_path)
        }
        Outcome::Replaced {
            old_path,
            new_path,
            entry,
            bytes,
            old_deleted,
        } => {
            if old_deleted {
                tree.files.remove(&old_path);
                report.deleted += 1;
            }
            tree.record_file(new_path.clone(), entry);
            report.succeeded += 1;
            report.bytes_transferred += bytes;
            Some(new_path)
        }
        Outcome::Failed {
            path,
            kind,
            message,
        } => {
            report.record_failure(path, kind, message);
            None
        }
    }
}
