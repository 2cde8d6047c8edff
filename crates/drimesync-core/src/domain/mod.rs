//! Domain entities and business logic
//!
//! This module contains the core domain types for DrimeSync:
//! - Newtypes for type-safe identifiers and relative path helpers
//! - Confidentiality modes
//! - Local and remote tree models
//! - Operations, plans and execution reports
//! - The mirror pass state machine
//! - Domain-specific error types

pub mod errors;
pub mod mode;
pub mod newtypes;
pub mod operation;
pub mod phase;
pub mod report;
pub mod tree;

// Re-export commonly used types
pub use errors::{DomainError, FailureKind, RemoteError};
pub use mode::ConfidentialityMode;
pub use newtypes::*;
pub use operation::{Operation, OperationPlan};
pub use phase::MirrorPhase;
pub use report::{ExecutionReport, FailedItem, PassStatus};
pub use tree::{LocalFileEntry, LocalTree, RemoteFileEntry, RemoteFolderEntry, RemoteTree};
