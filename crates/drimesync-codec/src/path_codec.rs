//! Remote path derivation per confidentiality mode
//!
//! | Mode         | Folder segments | File name                  |
//! |--------------|-----------------|----------------------------|
//! | Plain        | sanitized       | sanitized                  |
//! | Content-only | sanitized       | sanitized + `.enc`         |
//! | Partial      | encrypted       | encrypted stem + extension |
//! | Full         | encrypted       | encrypted name + `.enc`    |
//!
//! Sanitization rewrites a segment of exactly `"0"` to `"0.renamed"` (the
//! remote API misreads a bare `"0"`) and is reversed when decoding.
//!
//! ## Design Notes
//!
//! - Encoding and decoding are pure functions of `(path, is_folder, mode, key)`.
//! - Decoding never fails: segments that cannot be decrypted are kept as-is.

use drimesync_core::config::SNAPSHOT_FILE_NAME;
use drimesync_core::domain::ConfidentialityMode;

use crate::key::EncryptionKey;
use crate::name::{decrypt_name, encrypt_name};
use crate::CryptoError;

/// Reserved remote folder holding the published snapshot
pub const SNAPSHOT_FOLDER_NAME: &str = ".SyncStateFiles";

/// Marker appended to files whose content is encrypted
pub const ENCRYPTED_SUFFIX: &str = ".enc";

const ZERO_SEGMENT: &str = "0";
const ZERO_REPLACEMENT: &str = "0.renamed";

/// Maps local relative paths to remote-visible paths and back
#[derive(Debug, Clone)]
pub struct PathCodec {
    mode: ConfidentialityMode,
    key: Option<EncryptionKey>,
}

impl PathCodec {
    /// Creates a codec for `mode`
    ///
    /// # Errors
    /// [`CryptoError::MissingKey`] if the mode encrypts anything and no key is given.
    pub fn new(mode: ConfidentialityMode, key: Option<EncryptionKey>) -> Result<Self, CryptoError> {
        if mode.requires_key() && key.is_none() {
            return Err(CryptoError::MissingKey(mode.to_string()));
        }
        Ok(Self { mode, key })
    }

    /// Codec for [`ConfidentialityMode::Plain`]
    pub fn plain() -> Self {
        Self {
            mode: ConfidentialityMode::Plain,
            key: None,
        }
    }

    /// Active mode
    pub fn mode(&self) -> ConfidentialityMode {
        self.mode
    }

    /// Content key, present for every mode except Plain
    pub fn key(&self) -> Option<&EncryptionKey> {
        self.key.as_ref()
    }

    /// Key used for file bytes and the snapshot, `None` when content is sent as-is
    pub fn content_key(&self) -> Option<&EncryptionKey> {
        if self.mode.encrypts_content() {
            self.key.as_ref()
        } else {
            None
        }
    }

    // ------------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------------

    /// Encodes a `/`-separated local relative path
    pub fn encode_path(&self, relative_path: &str, is_folder: bool) -> String {
        let segments: Vec<&str> = relative_path.split('/').collect();
        let last = segments.len() - 1;
        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                if i == last && !is_folder {
                    self.encode_file_name(segment)
                } else {
                    self.encode_folder_name(segment)
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Remote-visible name of the last segment of `relative_path`
    pub fn remote_leaf_name(&self, relative_path: &str, is_folder: bool) -> String {
        let leaf = relative_path.rsplit('/').next().unwrap_or(relative_path);
        if is_folder {
            self.encode_folder_name(leaf)
        } else {
            self.encode_file_name(leaf)
        }
    }

    /// Encodes a single folder segment
    pub fn encode_folder_name(&self, name: &str) -> String {
        match (&self.key, self.mode.encrypts_names()) {
            (Some(key), true) => encrypt_name(name, key),
            _ => sanitize(name),
        }
    }

    /// Encodes a single file name
    pub fn encode_file_name(&self, name: &str) -> String {
        let key = match &self.key {
            Some(key) => key,
            None => return sanitize(name),
        };
        match self.mode {
            ConfidentialityMode::Plain => sanitize(name),
            ConfidentialityMode::ContentOnly => format!("{}{}", sanitize(name), ENCRYPTED_SUFFIX),
            ConfidentialityMode::Partial => {
                let (stem, ext) = split_extension(name);
                format!("{}{}", encrypt_name(stem, key), ext)
            }
            ConfidentialityMode::Full => format!("{}{}", encrypt_name(name, key), ENCRYPTED_SUFFIX),
        }
    }

    // ------------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------------

    /// Decodes a remote-visible path back to the local relative path
    pub fn decode_path(&self, remote_path: &str, is_folder: bool) -> String {
        let segments: Vec<&str> = remote_path.split('/').collect();
        let last = segments.len() - 1;
        segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                if i == last && !is_folder {
                    self.decode_file_name(segment)
                } else {
                    self.decode_folder_name(segment)
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Decodes a single folder segment
    pub fn decode_folder_name(&self, name: &str) -> String {
        match (&self.key, self.mode.encrypts_names()) {
            (Some(key), true) => decrypt_name(name, key),
            _ => unsanitize(name),
        }
    }

    /// Decodes a single file name
    pub fn decode_file_name(&self, name: &str) -> String {
        let key = match &self.key {
            Some(key) => key,
            None => return unsanitize(name),
        };
        match self.mode {
            ConfidentialityMode::Plain => unsanitize(name),
            ConfidentialityMode::ContentOnly => {
                unsanitize(name.strip_suffix(ENCRYPTED_SUFFIX).unwrap_or(name))
            }
            ConfidentialityMode::Partial => {
                let (stem, ext) = split_extension(name);
                format!("{}{}", decrypt_name(stem, key), ext)
            }
            ConfidentialityMode::Full => match name.strip_suffix(ENCRYPTED_SUFFIX) {
                Some(sealed) => decrypt_name(sealed, key),
                None => name.to_string(),
            },
        }
    }

    // ------------------------------------------------------------------------
    // Snapshot naming
    // ------------------------------------------------------------------------

    /// Remote path under which the snapshot is published
    pub fn snapshot_remote_path(&self) -> String {
        match (&self.key, self.mode) {
            (Some(key), ConfidentialityMode::Partial) => {
                let (stem, ext) = split_extension(SNAPSHOT_FILE_NAME);
                format!("{}/{}{}", SNAPSHOT_FOLDER_NAME, encrypt_name(stem, key), ext)
            }
            (Some(key), ConfidentialityMode::Full) => format!(
                "{}/{}{}",
                encrypt_name(SNAPSHOT_FOLDER_NAME, key),
                encrypt_name(SNAPSHOT_FILE_NAME, key),
                ENCRYPTED_SUFFIX
            ),
            _ => format!("{}/{}", SNAPSHOT_FOLDER_NAME, SNAPSHOT_FILE_NAME),
        }
    }

    /// Snapshot file names to search for during recovery, in order
    ///
    /// The plaintext name always comes first; the mode-specific encrypted
    /// name follows when a key is available and it differs.
    pub fn snapshot_candidates(&self) -> Vec<String> {
        let mut candidates = vec![SNAPSHOT_FILE_NAME.to_string()];
        if let Some(key) = &self.key {
            let encrypted = match self.mode {
                ConfidentialityMode::Partial => {
                    let (stem, ext) = split_extension(SNAPSHOT_FILE_NAME);
                    format!("{}{}", encrypt_name(stem, key), ext)
                }
                ConfidentialityMode::Full => {
                    format!("{}{}", encrypt_name(SNAPSHOT_FILE_NAME, key), ENCRYPTED_SUFFIX)
                }
                _ => encrypt_name(SNAPSHOT_FILE_NAME, key),
            };
            if encrypted != candidates[0] {
                candidates.push(encrypted);
            }
        }
        candidates
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Rewrites the reserved `"0"` segment
pub fn sanitize(segment: &str) -> String {
    if segment == ZERO_SEGMENT {
        ZERO_REPLACEMENT.to_string()
    } else {
        segment.to_string()
    }
}

/// Reverses [`sanitize`]
pub fn unsanitize(segment: &str) -> String {
    if segment == ZERO_REPLACEMENT {
        ZERO_SEGMENT.to_string()
    } else {
        segment.to_string()
    }
}

/// Splits a file name into stem and extension (extension keeps its dot)
///
/// Leading dots never start an extension: `".bashrc"` has none, while
/// `"a.tar.gz"` splits into `"a.tar"` and `".gz"`.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) if name[..dot].bytes().any(|b| b != b'.') => name.split_at(dot),
        _ => (name, ""),
    }
}
