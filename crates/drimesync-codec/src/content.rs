//! Content encryption envelope
//!
//! `nonce (24 bytes) || XChaCha20-Poly1305 ciphertext`, with a fresh random
//! nonce per call. Used for uploaded file bytes and for the state snapshot.

use std::path::Path;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::key::EncryptionKey;
use crate::name::NONCE_LEN;
use crate::CryptoError;

/// Size overhead of the envelope (nonce plus Poly1305 tag)
pub const ENVELOPE_OVERHEAD: u64 = NONCE_LEN as u64 + 16;

/// Encrypts bytes into a fresh envelope
pub fn encrypt_bytes(data: &[u8], key: &EncryptionKey) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), data)
        .map_err(|_| CryptoError::Encrypt)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Reads a whole file and encrypts it
pub fn encrypt_file(path: &Path, key: &EncryptionKey) -> Result<Vec<u8>, CryptoError> {
    let data = std::fs::read(path)?;
    encrypt_bytes(&data, key)
}

/// Opens an envelope
///
/// Returns `None` for truncated input, a wrong key or a tampered ciphertext.
pub fn decrypt_bytes(data: &[u8], key: &EncryptionKey) -> Option<Vec<u8>> {
    if data.len() < NONCE_LEN {
        return None;
    }
    let (nonce, ciphertext) = data.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher.decrypt(XNonce::from_slice(nonce), ciphertext).ok()
}
