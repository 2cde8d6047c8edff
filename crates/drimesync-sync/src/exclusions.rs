//! Exclusion patterns
//!
//! Patterns are read from the `_drimeexclude` file: one shell glob per line,
//! `#` starts a comment, blank lines are ignored. The file is created with
//! [`DEFAULT_PATTERNS`] on first use.
//!
//! ## Matching
//!
//! - `*` also matches `/`, so `docs/*.pdf` covers nested files
//! - A pattern ending in `/` only applies to directories and matches their
//!   name at any depth (`node_modules/`)
//! - A pattern without `/` also matches the last path segment (`*.tmp`)

use std::path::Path;

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use tracing::{debug, info, warn};

/// Patterns written to a fresh exclusion file
pub const DEFAULT_PATTERNS: &[&str] = &[
    "Thumbs.db",
    "desktop.ini",
    ".DS_Store",
    "._*",
    "*.tmp",
    "*.temp",
    "*.bak",
    "*.log",
    "*.swp",
    "~$*",
    "*.trashed*",
    "*.thumbnail*",
    "*.thumbnails*",
    "__pycache__/",
    ".git/",
    ".svn/",
    ".idea/",
    ".vscode/",
    "node_modules/",
    "venv/",
    ".env",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct Rule {
    pattern: Pattern,
    directory_only: bool,
    has_separator: bool,
}

/// Compiled set of exclusion patterns
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    rules: Vec<Rule>,
}

impl ExclusionSet {
    /// A set that excludes nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Compiles patterns, skipping comments, blanks and invalid globs
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for line in patterns {
            let line = line.as_ref().trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let directory_only = line.ends_with('/');
            let body = line.trim_end_matches('/');
            match Pattern::new(body) {
                Ok(pattern) => rules.push(Rule {
                    pattern,
                    directory_only,
                    has_separator: body.contains('/'),
                }),
                Err(e) => warn!(pattern = line, error = %e, "Ignoring invalid exclusion pattern"),
            }
        }
        Self { rules }
    }

    /// The default pattern set
    pub fn defaults() -> Self {
        Self::from_patterns(DEFAULT_PATTERNS.iter())
    }

    /// Loads the pattern file, writing the defaults first if it is missing
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            write_default_file(path)?;
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read exclusion file {}", path.display()))?;
        let set = Self::from_patterns(content.lines());
        debug!(path = %path.display(), rules = set.len(), "Exclusion patterns loaded");
        Ok(set)
    }

    /// Number of compiled rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule is active
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns true if `relative_path` must be skipped
    pub fn is_excluded(&self, relative_path: &str, is_dir: bool) -> bool {
        let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        self.rules.iter().any(|rule| {
            if rule.directory_only && !is_dir {
                return false;
            }
            rule.pattern.matches_with(relative_path, MATCH_OPTIONS)
                || (!rule.has_separator && rule.pattern.matches_with(name, MATCH_OPTIONS))
        })
    }
}

/// Writes the default pattern file, creating parent directories
pub fn write_default_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut content = String::from("# DrimeSync exclusion patterns, one glob per line\n");
    for pattern in DEFAULT_PATTERNS {
        content.push_str(pattern);
        content.push('\n');
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write exclusion file {}", path.display()))?;
    info!(path = %path.display(), "Default exclusion file created");
    Ok(())
}
