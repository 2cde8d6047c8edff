//! Sync observer port (driven/secondary port)
//!
//! The orchestrator and the transfer executor report log lines, progress and
//! phase changes through this capability. Presentation layers (CLI output,
//! desktop notifications, a GUI) implement it; the engine never formats
//! output itself.
//!
//! ## Design Notes
//!
//! - Methods are synchronous and must return quickly; they are called from
//!   worker tasks and must not block transfers.
//! - All methods have no-op defaults so adapters implement only what they show.

use serde::{Deserialize, Serialize};

use crate::domain::phase::MirrorPhase;

/// Severity of an engine log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Diagnostic detail
    Debug,
    /// Normal progress message
    Info,
    /// An operation finished successfully
    Success,
    /// Something unexpected that did not stop the pass
    Warning,
    /// An item or the pass failed
    Error,
}

/// Aggregate transfer progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Plaintext bytes uploaded so far
    pub bytes_done: u64,
    /// Plaintext bytes the plan will upload
    pub bytes_total: u64,
    /// Operations finished (successfully or not)
    pub ops_done: u64,
    /// Operations in the plan
    pub ops_total: u64,
    /// Path of the most recently progressed item
    pub current_path: Option<String>,
}

impl ProgressSnapshot {
    /// Byte completion in percent (0 when nothing is to be sent)
    pub fn percent(&self) -> u8 {
        if self.bytes_total == 0 {
            return 0;
        }
        ((self.bytes_done.min(self.bytes_total) * 100) / self.bytes_total) as u8
    }
}

/// Port trait for receiving engine events
pub trait ISyncObserver: Send + Sync {
    /// A user-facing log line
    fn log(&self, _level: LogLevel, _message: &str) {}

    /// Progress changed
    fn progress(&self, _snapshot: &ProgressSnapshot) {}

    /// The pass entered a new phase
    fn phase(&self, _phase: &MirrorPhase) {}
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl ISyncObserver for NullObserver {}
