//! DrimeSync API - Drime cloud REST API client
//!
//! Provides an async client for:
//! - Listing, creating, renaming and deleting workspace entries
//! - Single-request and multipart (S3 pre-signed) uploads
//! - Downloads that follow storage redirects without leaking credentials
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client and error mapping
//! - [`entries`] - File entry and folder operations
//! - [`upload`] - Simple and multipart upload operations
//! - [`provider`] - [`IRemoteApi`](drimesync_core::ports::IRemoteApi) implementation

pub mod client;
pub mod entries;
pub mod provider;
pub mod upload;

use drimesync_core::domain::RemoteError;
use thiserror::Error;

pub use client::DrimeClient;
pub use provider::DrimeRemote;

/// Errors that can occur when communicating with the Drime API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Message extracted from the JSON body, or the status text
        message: String,
    },

    /// A network-level error occurred (connect, timeout, broken body)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ApiError> for RemoteError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http { status, message } => {
                let text = format!("HTTP {}: {}", status, message);
                RemoteError::from_status(status, text.clone())
                    .unwrap_or(RemoteError::InvalidResponse(text))
            }
            ApiError::Network(e) if e.is_decode() => RemoteError::InvalidResponse(e.to_string()),
            ApiError::Network(e) => RemoteError::Network(e.to_string()),
            ApiError::InvalidResponse(msg) => RemoteError::InvalidResponse(msg),
        }
    }
}
