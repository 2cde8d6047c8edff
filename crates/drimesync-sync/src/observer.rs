//! `tracing`-backed observer
//!
//! Forwards engine log lines and phase changes to the `tracing` subscriber
//! installed by the binary. Progress is emitted at `trace` level only.

use drimesync_core::domain::MirrorPhase;
use drimesync_core::ports::{ISyncObserver, LogLevel, ProgressSnapshot};
use tracing::{debug, error, info, trace, warn};

/// Observer writing every event to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ISyncObserver for TracingObserver {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => debug!(target: "drimesync", "{}", message),
            LogLevel::Info => info!(target: "drimesync", "{}", message),
            LogLevel::Success => info!(target: "drimesync", success = true, "{}", message),
            LogLevel::Warning => warn!(target: "drimesync", "{}", message),
            LogLevel::Error => error!(target: "drimesync", "{}", message),
        }
    }

    fn progress(&self, snapshot: &ProgressSnapshot) {
        trace!(
            target: "drimesync",
            bytes_done = snapshot.bytes_done,
            bytes_total = snapshot.bytes_total,
            ops_done = snapshot.ops_done,
            ops_total = snapshot.ops_total,
            percent = snapshot.percent(),
            "Progress"
        );
    }

    fn phase(&self, phase: &MirrorPhase) {
        info!(target: "drimesync", phase = %phase, "Phase changed");
    }
}
