//! DrimeSync Core - Domain model and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `LocalTree`, `RemoteTree`, `Operation`, `OperationPlan`, `ExecutionReport`
//! - **Confidentiality modes** - `Plain`, `ContentOnly`, `Partial`, `Full`
//! - **Port definitions** - Traits for adapters: `IRemoteApi`, `ISyncObserver`
//! - **State machine** - Phases of a mirror pass (`MirrorPhase`)
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure data and rules with no I/O.
//! Ports define trait interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
