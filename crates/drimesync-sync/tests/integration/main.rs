//! Integration tests for drimesync-sync
//!
//! Drives the transfer executor and the pass orchestrator against an
//! in-memory remote workspace and real temporary directories.


mod test_executor;
mod test_orchestrator;
