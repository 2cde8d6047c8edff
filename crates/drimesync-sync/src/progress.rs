//! Aggregated transfer progress
//!
//! Counters live behind a mutex; the observer is called after the lock is
//! released so a slow observer cannot stall the workers on each other.

use std::sync::{Arc, Mutex};

use drimesync_core::ports::{ISyncObserver, ProgressSnapshot};

/// Shared progress counters for one pass
pub struct ProgressTracker {
    state: Mutex<ProgressSnapshot>,
    observer: Arc<dyn ISyncObserver>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &self.snapshot())
            .finish()
    }
}

impl ProgressTracker {
    /// Creates a tracker for `ops_total` operations moving `bytes_total` bytes
    pub fn new(bytes_total: u64, ops_total: u64, observer: Arc<dyn ISyncObserver>) -> Self {
        Self {
            state: Mutex::new(ProgressSnapshot {
                bytes_total,
                ops_total,
                ..ProgressSnapshot::default()
            }),
            observer,
        }
    }

    /// Current counters
    pub fn snapshot(&self) -> ProgressSnapshot {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Adds transferred bytes for `path`
    pub fn add_bytes(&self, path: &str, bytes: u64) {
        self.update(|state| {
            state.bytes_done += bytes;
            state.current_path = Some(path.to_string());
        });
    }

    /// Marks one operation finished
    pub fn complete_op(&self, path: &str) {
        self.update(|state| {
            state.ops_done += 1;
            state.current_path = Some(path.to_string());
        });
    }

    fn update(&self, apply: impl FnOnce(&mut ProgressSnapshot)) {
        let snapshot = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            apply(&mut state);
            state.clone()
        };
        self.observer.progress(&snapshot);
    }
}
