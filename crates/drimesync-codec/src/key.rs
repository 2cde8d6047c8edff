//! Password-based key derivation and salt persistence
//!
//! ## Design Notes
//!
//! - The key is 32 bytes of Argon2id (v0x13) output over the UTF-8 password
//!   and a 16-byte salt.
//! - The salt is stored as raw bytes. A second device pairs with the same
//!   workspace by importing the salt exported as URL-safe base64.
//! - Key material lives in [`Zeroizing`] buffers and is redacted from `Debug`.

use std::fmt;
use std::path::{Path, PathBuf};

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::CryptoError;

/// Length of the derived content key in bytes
pub const KEY_LEN: usize = 32;

/// Length of the Argon2 salt in bytes
pub const SALT_LEN: usize = 16;

// ============================================================================
// EncryptionKey
// ============================================================================

/// Symmetric key used for names, content and the snapshot
#[derive(Clone)]
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Wraps raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptionKey").field(&"<redacted>").finish()
    }
}

// ============================================================================
// Key derivation
// ============================================================================

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub lanes: u32,
}

impl KdfParams {
    /// Production parameters: 256 MiB, 3 passes, 1 lane
    pub const MODERATE: KdfParams = KdfParams {
        memory_kib: 256 * 1024,
        iterations: 3,
        lanes: 1,
    };

    /// Minimal parameters, only suitable for tests
    pub const INSECURE_FAST: KdfParams = KdfParams {
        memory_kib: 8,
        iterations: 1,
        lanes: 1,
    };
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::MODERATE
    }
}

/// Derives the content key from a password and salt with production costs
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> Result<EncryptionKey, CryptoError> {
    derive_key_with_params(password, salt, KdfParams::MODERATE)
}

/// Derives the content key with explicit Argon2id costs
pub fn derive_key_with_params(
    password: &str,
    salt: &[u8; SALT_LEN],
    params: KdfParams,
) -> Result<EncryptionKey, CryptoError> {
    let params = Params::new(
        params.memory_kib,
        params.iterations,
        params.lanes,
        Some(KEY_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut output[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(EncryptionKey(output))
}

// ============================================================================
// Salt persistence
// ============================================================================

/// File-backed store for the 16-byte salt
#[derive(Debug, Clone)]
pub struct SaltStore {
    path: PathBuf,
}

impl SaltStore {
    /// Creates a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the salt file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the salt, generating and persisting a random one when missing
    pub fn load_or_generate(&self) -> Result<[u8; SALT_LEN], CryptoError> {
        if self.path.exists() {
            let bytes = std::fs::read(&self.path)?;
            let salt = to_salt(&bytes)?;
            debug!(path = %self.path.display(), "Loaded existing salt");
            return Ok(salt);
        }

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        self.write(&salt)?;
        info!(path = %self.path.display(), "Generated new salt");
        Ok(salt)
    }

    /// Exports the salt as URL-safe base64 (with padding)
    pub fn export_base64(&self) -> Result<String, CryptoError> {
        Ok(URL_SAFE.encode(self.load_or_generate()?))
    }

    /// Replaces the stored salt with one exported from another device
    ///
    /// Padding is optional. Keys derived from the previous salt become
    /// useless for data encrypted afterwards.
    pub fn import_base64(&self, encoded: &str) -> Result<(), CryptoError> {
        let trimmed = encoded.trim().trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .map_err(|e| CryptoError::InvalidSalt(e.to_string()))?;
        let salt = to_salt(&bytes)?;
        self.write(&salt)?;
        info!(path = %self.path.display(), "Imported salt");
        Ok(())
    }

    fn write(&self, salt: &[u8; SALT_LEN]) -> Result<(), CryptoError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, salt)?;
        Ok(())
    }
}

fn to_salt(bytes: &[u8]) -> Result<[u8; SALT_LEN], CryptoError> {
    bytes.try_into().map_err(|_| {
        CryptoError::InvalidSalt(format!(
            "expected {} bytes, found {}",
            SALT_LEN,
            bytes.len()
        ))
    })
}
