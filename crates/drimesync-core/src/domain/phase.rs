//! Mirror pass state machine
//!
//! A pass moves through
//! `Idle → Scanning → Diffing → Transferring → Checkpointing → Publishing → Done`.
//! `ForceResync` is an optional pre-state between `Idle` and `Scanning`.
//! `Cancelled` and `Failed` are terminal and reachable from any
//! non-terminal phase; dry-run passes go from `Diffing` straight to `Done`.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Phase of a mirror pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorPhase {
    /// Not started
    Idle,
    /// Wiping the remote workspace and the local snapshot
    ForceResync,
    /// Walking the local tree
    Scanning,
    /// Loading known state and computing the plan
    Diffing,
    /// Executing the plan against the remote
    Transferring,
    /// Writing the final local snapshot
    Checkpointing,
    /// Uploading the snapshot to the remote workspace
    Publishing,
    /// Finished
    Done,
    /// Stopped on user request
    Cancelled,
    /// Aborted by a setup failure
    Failed(String),
}

impl MirrorPhase {
    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            MirrorPhase::Idle => "Idle",
            MirrorPhase::ForceResync => "ForceResync",
            MirrorPhase::Scanning => "Scanning",
            MirrorPhase::Diffing => "Diffing",
            MirrorPhase::Transferring => "Transferring",
            MirrorPhase::Checkpointing => "Checkpointing",
            MirrorPhase::Publishing => "Publishing",
            MirrorPhase::Done => "Done",
            MirrorPhase::Cancelled => "Cancelled",
            MirrorPhase::Failed(_) => "Failed",
        }
    }

    /// Returns true for phases a pass cannot leave
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MirrorPhase::Done | MirrorPhase::Cancelled | MirrorPhase::Failed(_)
        )
    }

    /// Checks whether moving to `target` is a legal transition
    pub fn can_transition_to(&self, target: &MirrorPhase) -> bool {
        if self.is_terminal() {
            return false;
        }

        if matches!(target, MirrorPhase::Cancelled | MirrorPhase::Failed(_)) {
            return true;
        }

        matches!(
            (self, target),
            (MirrorPhase::Idle, MirrorPhase::ForceResync)
                | (MirrorPhase::Idle, MirrorPhase::Scanning)
                | (MirrorPhase::ForceResync, MirrorPhase::Scanning)
                | (MirrorPhase::Scanning, MirrorPhase::Diffing)
                | (MirrorPhase::Diffing, MirrorPhase::Transferring)
                | (MirrorPhase::Diffing, MirrorPhase::Done)
                | (MirrorPhase::Transferring, MirrorPhase::Checkpointing)
                | (MirrorPhase::Checkpointing, MirrorPhase::Publishing)
                | (MirrorPhase::Publishing, MirrorPhase::Done)
        )
    }

    /// Moves to `target`, rejecting illegal transitions
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidState`] if the transition is not allowed
    pub fn transition_to(&mut self, target: MirrorPhase) -> Result<(), DomainError> {
        if !self.can_transition_to(&target) {
            return Err(DomainError::InvalidState {
                from: self.name().to_string(),
                to: target.name().to_string(),
            });
        }
        *self = target;
        Ok(())
    }
}

impl Default for MirrorPhase {
    fn default() -> Self {
        MirrorPhase::Idle
    }
}

impl Display for MirrorPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MirrorPhase::Failed(reason) => write!(f, "Failed: {reason}"),
            other => write!(f, "{}", other.name()),
        }
    }
}
