//! Integration tests for drimesync-api
//!
//! Uses wiremock to simulate the Drime API and verifies end-to-end
//! behavior of entry operations, uploads and downloads through the
//! IRemoteApi implementation.

mod common;

mod test_entries;
mod test_uploads;
