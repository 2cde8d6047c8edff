//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the mirror engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteApi`] - Remote workspace operations (Drime REST API)
//! - [`ISyncObserver`] - Log lines, progress and phase reporting

pub mod remote_api;
pub mod sync_observer;

pub use remote_api::{
    CompletedPart, EntryPage, EntryType, IRemoteApi, ListQuery, MultipartSession, RemoteEntry,
    SignedPart, UploadTarget,
};
pub use sync_observer::{ISyncObserver, LogLevel, NullObserver, ProgressSnapshot};
