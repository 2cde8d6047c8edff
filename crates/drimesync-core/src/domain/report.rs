//! Execution report of a mirror pass
//!
//! The report is always produced, including after partial failure, so every
//! failed path is attributable to an error kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::FailureKind;

/// Outcome of a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStatus {
    /// All phases ran (individual items may still have failed)
    Completed,
    /// Only the plan was computed
    DryRun,
    /// Stopped on user request
    Cancelled,
    /// Aborted during setup
    Failed(String),
}

impl std::fmt::Display for PassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassStatus::Completed => write!(f, "completed"),
            PassStatus::DryRun => write!(f, "dry run"),
            PassStatus::Cancelled => write!(f, "cancelled"),
            PassStatus::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// One item that could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Relative path of the item
    pub path: String,
    /// Error classification
    pub kind: FailureKind,
    /// Human-readable reason
    pub message: String,
}

/// Summary of a pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Pass outcome
    pub status: PassStatus,
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// Number of operations in the plan
    pub planned: u64,
    /// Uploads and folder creations that succeeded
    pub succeeded: u64,
    /// Renames (in place or moved) that succeeded
    pub renamed: u64,
    /// Remote files and folders deleted
    pub deleted: u64,
    /// Items that failed
    pub failed: u64,
    /// Per-item failures
    pub failures: Vec<FailedItem>,
    /// Plaintext bytes uploaded
    pub bytes_transferred: u64,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
}

impl ExecutionReport {
    /// Creates an empty report for a pass starting now
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            status: PassStatus::Completed,
            started_at,
            planned: 0,
            succeeded: 0,
            renamed: 0,
            deleted: 0,
            failed: 0,
            failures: Vec::new(),
            bytes_transferred: 0,
            duration_ms: 0,
        }
    }

    /// Records a failed item
    pub fn record_failure(
        &mut self,
        path: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) {
        self.failed += 1;
        self.failures.push(FailedItem {
            path: path.into(),
            kind,
            message: message.into(),
        });
    }

    /// Average upload speed with the duration floored at one second
    pub fn speed_bytes_per_sec(&self) -> f64 {
        let secs = (self.duration_ms as f64 / 1000.0).max(1.0);
        self.bytes_transferred as f64 / secs
    }

    /// Multi-line summary suitable for a terminal or a notification body
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Mirror {}\n\nSucceeded: {}\nRenamed:   {}\nDeleted:   {}\nFailed:    {}\n\nVolume:    {}\nSpeed:     {}/s\nDuration:  {}s",
            self.status,
            self.succeeded,
            self.renamed,
            self.deleted,
            self.failed,
            format_size(self.bytes_transferred),
            format_size(self.speed_bytes_per_sec() as u64),
            self.duration_ms / 1000,
        );
        for failure in &self.failures {
            out.push_str(&format!(
                "\n  - {} [{}] {}",
                failure.path, failure.kind, failure.message
            ));
        }
        out
    }
}

/// Formats a byte count with binary units
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}
