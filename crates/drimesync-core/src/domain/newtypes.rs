//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for identifiers and relative paths. Each newtype
//! ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::errors::DomainError;

// ============================================================================
// EntryId
// ============================================================================

/// Identifier of a remote file or folder entry
///
/// The remote API returns numeric ids; the value is kept as an opaque
/// string. Deserialization accepts both JSON numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Create a new EntryId
    ///
    /// # Errors
    /// Returns error if the id is empty or only whitespace
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidEntryId(
                "Entry ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        EntryId::new(raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Relative path helpers
// ============================================================================

/// Validates a `/`-separated path relative to the mirror root
///
/// # Errors
/// Returns error for empty paths, absolute paths, backslashes, and empty,
/// `.` or `..` segments
pub fn validate_relative_path(path: &str) -> Result<(), DomainError> {
    if path.is_empty() {
        return Err(DomainError::InvalidPath("path cannot be empty".to_string()));
    }
    if path.starts_with('/') || path.contains('\\') {
        return Err(DomainError::InvalidPath(path.to_string()));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(DomainError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Parent of a relative path, `None` for top-level entries
pub fn parent_of(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Last segment of a relative path
pub fn file_name_of(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Number of segments in a relative path
pub fn depth_of(path: &str) -> usize {
    path.split('/').count()
}
