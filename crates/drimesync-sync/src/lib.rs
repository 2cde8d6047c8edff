//! DrimeSync Sync - Mirror reconciliation and transfer engine
//!
//! Provides:
//! - Local tree scanning with exclusion globs and cheap fingerprints
//! - Known remote state persistence with cloud-side recovery
//! - Diff computation with same-parent rename detection
//! - Bounded-concurrency transfers with multipart, retry, pause and cancel
//! - A pass orchestrator with dry-run and force-resync
//!
//! ## Modules
//!
//! - [`fingerprint`] - Size plus boundary-sample MD5 fingerprint
//! - [`exclusions`] - `_drimeexclude` pattern file and matching
//! - [`scanner`] - Local tree walk producing a [`LocalTree`](drimesync_core::domain::LocalTree)
//! - [`state_store`] - Snapshot load, save, recovery and publishing
//! - [`diff`] - Operation plan computation
//! - [`control`] - Shared pause and cancellation flags
//! - [`progress`] - Aggregated progress reporting
//! - [`multipart`] - Part loop for large uploads
//! - [`executor`] - Worker pool applying an operation plan
//! - [`orchestrator`] - Pass state machine
//! - [`observer`] - `tracing`-backed observer

pub mod control;
pub mod diff;
pub mod exclusions;
pub mod executor;
pub mod fingerprint;
pub mod multipart;
pub mod observer;
pub mod orchestrator;
pub mod progress;
pub mod scanner;
pub mod state_store;

use std::path::PathBuf;

use drimesync_core::domain::{DomainError, FailureKind, RemoteError};
use drimesync_codec::CryptoError;
use thiserror::Error;

pub use control::TransferControl;
pub use executor::{TransferExecutor, TransferSettings};
pub use observer::TracingObserver;
pub use orchestrator::{MirrorOrchestrator, PassOptions};
pub use state_store::{Checkpoint, StateStore};

/// Errors that can occur during a mirror pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A remote API call failed
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Encrypting a file or the snapshot failed
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Cancellation was requested
    #[error("Cancelled")]
    Cancelled,

    /// The local mirror root is missing or not a readable directory
    #[error("Local root is not a readable directory: {0}")]
    LocalRootUnreadable(PathBuf),

    /// A domain-level error propagated from drimesync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Reading or writing the local snapshot failed
    #[error(transparent)]
    State(#[from] anyhow::Error),
}

impl SyncError {
    /// Report-level classification of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            SyncError::Remote(err) => err.kind(),
            SyncError::Crypto(_) => FailureKind::Crypto,
            SyncError::Cancelled => FailureKind::Cancelled,
            SyncError::Io(_)
            | SyncError::LocalRootUnreadable(_)
            | SyncError::Domain(_)
            | SyncError::State(_) => {
                FailureKind::Local
            }
        }
    }

    /// Returns true when a file-level retry may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(err) => err.is_retryable(),
            _ => false,
        }
    }
}
