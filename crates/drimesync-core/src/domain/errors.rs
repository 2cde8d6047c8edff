//! Domain error types
//!
//! This module defines the error types shared by every layer of the mirror:
//! validation failures in the domain model, the classified failure a remote
//! call can produce, and the per-item failure kind recorded in reports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid relative path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Unknown confidentiality mode name
    #[error("Unknown confidentiality mode: {0}")]
    UnknownMode(String),

    /// Invalid remote entry identifier
    #[error("Invalid entry ID: {0}")]
    InvalidEntryId(String),

    /// Invalid pass phase transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current phase
        from: String,
        /// The attempted target phase
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

// ============================================================================
// RemoteError
// ============================================================================

/// Classified failure of a remote API call
///
/// Adapters map their transport and HTTP errors into these kinds so that the
/// executor can decide between "retry this item" and "abort this item"
/// without knowing anything about the wire protocol.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connection failure, timeout or broken transfer
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 401 or 403
    #[error("Authentication rejected (HTTP {status}): {message}")]
    Auth {
        /// HTTP status code
        status: u16,
        /// Error text returned by the server
        message: String,
    },

    /// Any other HTTP 4xx
    #[error("Client error (HTTP {status}): {message}")]
    Client {
        /// HTTP status code
        status: u16,
        /// Error text returned by the server
        message: String,
    },

    /// HTTP 5xx
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error text returned by the server
        message: String,
    },

    /// The response could not be parsed or lacked a required field
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The operation was abandoned because cancellation was requested
    #[error("Operation cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Maps an HTTP status code and message to the matching error kind
    ///
    /// Returns `None` for non-error statuses.
    pub fn from_status(status: u16, message: impl Into<String>) -> Option<Self> {
        let message = message.into();
        match status {
            401 | 403 => Some(RemoteError::Auth { status, message }),
            400..=499 => Some(RemoteError::Client { status, message }),
            500..=599 => Some(RemoteError::Server { status, message }),
            _ => None,
        }
    }

    /// Returns true when the same request may succeed if tried again
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteError::Network(_) | RemoteError::Server { .. })
    }

    /// The report-level classification of this error
    pub fn kind(&self) -> FailureKind {
        match self {
            RemoteError::Network(_) => FailureKind::Network,
            RemoteError::Auth { .. } => FailureKind::Auth,
            RemoteError::Client { .. } => FailureKind::Client,
            RemoteError::Server { .. } | RemoteError::InvalidResponse(_) => FailureKind::Server,
            RemoteError::Cancelled => FailureKind::Cancelled,
        }
    }
}

// ============================================================================
// FailureKind
// ============================================================================

/// Classification attached to every failed item in an execution report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection or timeout failure
    Network,
    /// Credentials rejected
    Auth,
    /// Request rejected by the server (4xx)
    Client,
    /// Server-side failure (5xx) or unusable response
    Server,
    /// Local encryption or decryption failure
    Crypto,
    /// Abandoned after cancellation
    Cancelled,
    /// Local filesystem failure (read, stat, temp file)
    Local,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Network => "network",
            FailureKind::Auth => "auth",
            FailureKind::Client => "client",
            FailureKind::Server => "server",
            FailureKind::Crypto => "crypto",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Local => "local",
        };
        write!(f, "{}", s)
    }
}
