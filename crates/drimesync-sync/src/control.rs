//! Pause and cancellation flags shared by the workers of a pass
//!
//! Cancellation is cooperative: workers poll [`TransferControl::is_cancelled`]
//! between units of work and between multipart parts. Pausing parks workers
//! on a `watch` channel before they pick up the next unit.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::info;

/// Shared control flags for one pass
#[derive(Debug)]
pub struct TransferControl {
    cancelled: AtomicBool,
    paused: watch::Sender<bool>,
}

impl Default for TransferControl {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferControl {
    /// Creates flags in the running state
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            cancelled: AtomicBool::new(false),
            paused,
        }
    }

    /// Requests cancellation; also releases paused workers
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!("Cancellation requested");
        }
        self.paused.send_replace(false);
    }

    /// Returns true once cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Parks workers before their next unit of work
    pub fn pause(&self) {
        if !self.is_cancelled() {
            self.paused.send_replace(true);
            info!("Transfers paused");
        }
    }

    /// Releases paused workers
    pub fn resume(&self) {
        self.paused.send_replace(false);
        info!("Transfers resumed");
    }

    /// Returns true while paused
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Waits until the pass is not paused
    ///
    /// Returns `false` if cancellation was requested (before or while waiting).
    pub async fn wait_if_paused(&self) -> bool {
        let mut rx = self.paused.subscribe();
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
        !self.is_cancelled()
    }
}
