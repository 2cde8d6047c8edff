//! Confidentiality modes
//!
//! A mode decides which parts of the mirrored tree stay readable on the
//! remote side: folder names, file base names, extensions and bytes.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// How much of the mirror is encrypted before it leaves the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidentialityMode {
    /// Nothing is encrypted; `"0"` segments are still sanitized
    #[default]
    Plain,
    /// File bytes are encrypted, names stay readable with a `.enc` marker
    ContentOnly,
    /// Bytes, folder names and file base names are encrypted; extensions stay readable
    Partial,
    /// Bytes and every name are encrypted (zero-knowledge)
    Full,
}

impl ConfidentialityMode {
    /// All modes, in increasing order of confidentiality
    pub const ALL: [ConfidentialityMode; 4] = [
        ConfidentialityMode::Plain,
        ConfidentialityMode::ContentOnly,
        ConfidentialityMode::Partial,
        ConfidentialityMode::Full,
    ];

    /// Returns true if file bytes (and the persisted snapshot) are encrypted
    pub fn encrypts_content(&self) -> bool {
        !matches!(self, ConfidentialityMode::Plain)
    }

    /// Returns true if folder and file names are encrypted
    pub fn encrypts_names(&self) -> bool {
        matches!(
            self,
            ConfidentialityMode::Partial | ConfidentialityMode::Full
        )
    }

    /// Returns true if the mode needs a content key to operate
    pub fn requires_key(&self) -> bool {
        self.encrypts_content()
    }

    /// Stable configuration name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidentialityMode::Plain => "plain",
            ConfidentialityMode::ContentOnly => "content_only",
            ConfidentialityMode::Partial => "partial",
            ConfidentialityMode::Full => "full",
        }
    }
}

impl Display for ConfidentialityMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConfidentialityMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "none" => Ok(ConfidentialityMode::Plain),
            "content_only" | "content-only" | "standard" => Ok(ConfidentialityMode::ContentOnly),
            "partial" | "advanced" => Ok(ConfidentialityMode::Partial),
            "full" | "zk" | "zero_knowledge" => Ok(ConfidentialityMode::Full),
            other => Err(DomainError::UnknownMode(other.to_string())),
        }
    }
}
