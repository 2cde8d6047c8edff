//! Mirror pass orchestrator
//!
//! Drives one pass through the [`MirrorPhase`] state machine:
//!
//! ```text
//! Idle ─▶ [ForceResync] ─▶ Scanning ─▶ Diffing ─▶ Transferring ─▶ Checkpointing ─▶ Publishing ─▶ Done
//!                                         └── dry run ──────────────────────────────────────────▶ Done
//! ```
//!
//! ## Design Notes
//!
//! - Only setup failures abort a pass: an unreadable local root, an
//!   unlistable remote root, or a snapshot that cannot be read or written.
//!   Per-item failures end up in the [`ExecutionReport`].
//! - A cancelled pass still saves the tree it reached, but never publishes.
//! - A dry run never mutates anything; with force-resync it only reports
//!   the wipe and plans against an empty tree.
//! - A failed snapshot publish is logged and does not fail the pass; the
//!   next pass publishes again.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use drimesync_codec::PathCodec;
use drimesync_core::config::Config;
use drimesync_core::domain::{
    EntryId, ExecutionReport, LocalTree, MirrorPhase, OperationPlan, PassStatus, RemoteTree,
};
use drimesync_core::ports::{IRemoteApi, ISyncObserver, ListQuery, LogLevel};
use tracing::{debug, error, info, instrument, warn};

use crate::control::TransferControl;
use crate::diff::diff;
use crate::exclusions::ExclusionSet;
use crate::executor::{TransferExecutor, TransferSettings, DELETE_BATCH_SIZE};
use crate::scanner::scan;
use crate::state_store::StateStore;
use crate::SyncError;

/// Upper bound on list-and-delete rounds during force-resync
const MAX_RESYNC_ROUNDS: u32 = 10_000;

/// Per-pass switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOptions {
    /// Compute and log the plan without touching remote or local state
    pub dry_run: bool,
    /// Wipe the remote workspace and the local snapshot first
    pub force_resync: bool,
}

/// Runs mirror passes for one local root and one remote workspace
pub struct MirrorOrchestrator {
    config: Config,
    remote: Arc<dyn IRemoteApi>,
    codec: Arc<PathCodec>,
    observer: Arc<dyn ISyncObserver>,
    control: Arc<TransferControl>,
    settings: TransferSettings,
    phase: MirrorPhase,
}

impl MirrorOrchestrator {
    /// Creates an orchestrator
    ///
    /// # Arguments
    /// * `config` - Mirror, transfer and state settings
    /// * `remote` - Remote API port
    /// * `codec` - Path codec for the configured mode
    /// * `observer` - Receiver of log lines, progress and phase changes
    pub fn new(
        config: Config,
        remote: Arc<dyn IRemoteApi>,
        codec: Arc<PathCodec>,
        observer: Arc<dyn ISyncObserver>,
    ) -> Self {
        let settings = TransferSettings::from_config(&config);
        Self {
            config,
            remote,
            codec,
            observer,
            control: Arc::new(TransferControl::new()),
            settings,
            phase: MirrorPhase::Idle,
        }
    }

    /// Overrides the transfer settings derived from the configuration
    pub fn with_settings(mut self, settings: TransferSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Pause and cancellation handle for this orchestrator
    pub fn control(&self) -> Arc<TransferControl> {
        Arc::clone(&self.control)
    }

    /// Phase reached by the current or last pass
    pub fn phase(&self) -> &MirrorPhase {
        &self.phase
    }

    /// State store for the configured snapshot location
    pub fn state_store(&self) -> StateStore {
        StateStore::new(self.config.snapshot_path(), Arc::clone(&self.codec))
    }

    /// Runs one mirror pass
    ///
    /// # Returns
    /// The pass report. Cancellation yields a report with
    /// [`PassStatus::Cancelled`] rather than an error.
    ///
    /// # Errors
    /// Setup failures: unreadable local root, unlistable remote root, or an
    /// unusable local snapshot. The phase is left at [`MirrorPhase::Failed`].
    #[instrument(skip(self), fields(root = %self.config.mirror.local_root.display()))]
    pub async fn run(&mut self, options: PassOptions) -> Result<ExecutionReport, SyncError> {
        self.phase = MirrorPhase::Idle;
        let started = Instant::now();
        let started_at = Utc::now();

        match self.run_pass(options, started_at).await {
            Ok(mut report) => {
                report.started_at = started_at;
                report.duration_ms = started.elapsed().as_millis() as u64;
                info!(status = %report.status, duration_ms = report.duration_ms, "Pass finished");
                Ok(report)
            }
            Err(SyncError::Cancelled) => {
                self.finish(MirrorPhase::Cancelled);
                let mut report = ExecutionReport::new(started_at);
                report.status = PassStatus::Cancelled;
                report.duration_ms = started.elapsed().as_millis() as u64;
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Pass aborted");
                self.observer
                    .log(LogLevel::Error, &format!("Mirror pass aborted: {}", e));
                self.finish(MirrorPhase::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run_pass(
        &mut self,
        options: PassOptions,
        started_at: DateTime<Utc>,
    ) -> Result<ExecutionReport, SyncError> {
        self.preflight().await?;
        let store = self.state_store();

        let wipe_planned = options.force_resync && options.dry_run;
        if wipe_planned {
            self.observer.log(
                LogLevel::Info,
                &format!(
                    "[dry run] force resync would delete every entry of workspace {}",
                    self.config.mirror.workspace_id
                ),
            );
        } else if options.force_resync {
            self.enter(MirrorPhase::ForceResync)?;
            self.force_resync(&store).await?;
        }

        self.enter(MirrorPhase::Scanning)?;
        let local = self.scan_local().await?;
        self.observer.log(
            LogLevel::Info,
            &format!(
                "Scanned {} files and {} folders",
                local.files.len(),
                local.folders.len()
            ),
        );
        if self.control.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        self.enter(MirrorPhase::Diffing)?;
        let ws = self.config.mirror.workspace_id.clone();
        let mut tree = if wipe_planned {
            RemoteTree::new()
        } else if options.dry_run {
            match store.load_local()? {
                Some(tree) => tree,
                None => store
                    .recover(self.remote.as_ref(), &ws)
                    .await
                    .unwrap_or_else(RemoteTree::new),
            }
        } else {
            store.load(self.remote.as_ref(), &ws).await?
        };
        tree.mode = Some(self.codec.mode());
        let plan = diff(&local, &tree);
        info!(operations = plan.len(), bytes = plan.upload_bytes(), "Plan ready");

        if options.dry_run {
            return self.dry_run(&plan, started_at);
        }
        if self.control.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        self.enter(MirrorPhase::Transferring)?;
        let executor = TransferExecutor::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.codec),
            self.settings.clone(),
            Arc::clone(&self.control),
            Arc::clone(&self.observer),
        );
        let mut report = executor.execute(&plan, &mut tree, &store).await;

        if self.control.is_cancelled() {
            store.save(&tree)?;
            report.status = PassStatus::Cancelled;
            self.observer
                .log(LogLevel::Warning, "Mirror pass cancelled, state saved");
            self.finish(MirrorPhase::Cancelled);
            return Ok(report);
        }

        self.enter(MirrorPhase::Checkpointing)?;
        store.save(&tree)?;

        self.enter(MirrorPhase::Publishing)?;
        let publish = store
            .publish(
                self.remote.as_ref(),
                &ws,
                &tree,
                self.config.transfer.snapshot_publish_attempts,
                Duration::from_secs(self.config.transfer.snapshot_retry_delay_secs),
            )
            .await;
        if let Err(e) = publish {
            warn!(error = %e, "Snapshot could not be published");
            self.observer
                .log(LogLevel::Warning, &format!("Snapshot not published: {}", e));
        }

        self.enter(MirrorPhase::Done)?;
        report.status = PassStatus::Completed;
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------------

    fn enter(&mut self, next: MirrorPhase) -> Result<(), SyncError> {
        self.phase.transition_to(next)?;
        debug!(phase = %self.phase, "Entered phase");
        self.observer.phase(&self.phase);
        Ok(())
    }

    /// Moves to a terminal phase if the current one allows it
    fn finish(&mut self, terminal: MirrorPhase) {
        if self.phase.can_transition_to(&terminal) {
            self.phase = terminal;
            self.observer.phase(&self.phase);
        }
    }

    /// Checks that the local root is readable and the remote root listable
    async fn preflight(&self) -> Result<(), SyncError> {
        let root = &self.config.mirror.local_root;
        if tokio::fs::read_dir(root).await.is_err() {
            return Err(SyncError::LocalRootUnreadable(root.clone()));
        }
        self.remote
            .list_entries(&ListQuery::root(self.config.mirror.workspace_id.clone()))
            .await?;
        Ok(())
    }

    /// Deletes every root entry of the workspace, then the local snapshot
    #[instrument(skip(self, store))]
    async fn force_resync(&self, store: &StateStore) -> Result<(), SyncError> {
        let query = ListQuery::root(self.config.mirror.workspace_id.clone());
        let mut removed = 0usize;

        for round in 1..=MAX_RESYNC_ROUNDS {
            if self.control.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let page = self.remote.list_entries(&query).await?;
            if page.entries.is_empty() {
                break;
            }
            let ids: Vec<EntryId> = page.entries.into_iter().map(|e| e.id).collect();
            for batch in ids.chunks(DELETE_BATCH_SIZE) {
                self.remote.delete_entries(batch, true).await?;
            }
            removed += ids.len();
            debug!(round, removed, "Force resync round");
            if round == MAX_RESYNC_ROUNDS {
                warn!(removed, "Force resync stopped at the round limit");
            }
        }

        store.discard()?;
        info!(removed, "Remote workspace wiped");
        self.observer.log(
            LogLevel::Warning,
            &format!("Force resync removed {} remote entries", removed),
        );
        Ok(())
    }

    async fn scan_local(&self) -> Result<LocalTree, SyncError> {
        let root: PathBuf = self.config.mirror.local_root.clone();
        let exclusion_file = self
            .config
            .mirror
            .use_exclusions
            .then(|| self.config.exclusion_path());

        tokio::task::spawn_blocking(move || {
            let exclusions = match exclusion_file {
                Some(path) => ExclusionSet::load_or_init(&path).unwrap_or_else(|e| {
                    warn!(error = %e, "Exclusion file unusable, using defaults");
                    ExclusionSet::defaults()
                }),
                None => ExclusionSet::none(),
            };
            scan(&root, &exclusions)
        })
        .await
        .map_err(|e| SyncError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    fn dry_run(
        &mut self,
        plan: &OperationPlan,
        started_at: DateTime<Utc>,
    ) -> Result<ExecutionReport, SyncError> {
        for op in plan.iter() {
            self.observer.log(LogLevel::Info, &format!("[dry run] {}", op));
        }

        let mut report = ExecutionReport::new(started_at);
        report.status = PassStatus::DryRun;
        report.planned = plan.len() as u64;
        report.succeeded = (plan.folder_creates.len() + plan.uploads.len()) as u64;
        report.renamed = plan.renames.len() as u64;
        report.deleted = (plan.file_deletes.len() + plan.folder_deletes.len()) as u64;
        report.bytes_transferred = plan.upload_bytes();

        self.enter(MirrorPhase::Done)?;
        Ok(report)
    }
}
