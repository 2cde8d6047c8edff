//! DrimeSync Codec - Cryptographic primitives and remote path derivation
//!
//! This crate provides:
//! - **Key derivation** - Argon2id password-to-key with a persisted salt
//! - **Name encryption** - Deterministic XChaCha20-Poly1305 with a keyed
//!   BLAKE2b synthetic nonce, so equal names map to equal ciphertexts
//! - **Content encryption** - Randomized XChaCha20-Poly1305 envelopes
//!   (`nonce || ciphertext`) for file bytes and the state snapshot
//! - **Path codec** - Mode-dependent mapping between local relative paths
//!   and remote-visible paths
//!
//! Decryption never fails loudly: names that cannot be decrypted come back
//! unchanged and content that cannot be decrypted comes back as `None`.

pub mod content;
pub mod key;
pub mod name;
pub mod path_codec;

use thiserror::Error;

pub use content::{decrypt_bytes, encrypt_bytes, encrypt_file};
pub use key::{derive_key, EncryptionKey, KdfParams, SaltStore};
pub use name::{decrypt_name, encrypt_name, try_decrypt_name};
pub use path_codec::{PathCodec, SNAPSHOT_FOLDER_NAME};

/// Errors that can occur while deriving keys or encrypting data
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Argon2 rejected the parameters or the input
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// The AEAD refused to seal the input
    #[error("Encryption failed")]
    Encrypt,

    /// A salt was not 16 bytes or not valid base64
    #[error("Invalid salt: {0}")]
    InvalidSalt(String),

    /// An encrypted mode was selected without a key
    #[error("Mode '{0}' requires an encryption key")]
    MissingKey(String),

    /// Reading a file or the salt store failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
