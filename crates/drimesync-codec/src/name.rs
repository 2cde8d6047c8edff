//! Deterministic name encryption
//!
//! A name is sealed with XChaCha20-Poly1305 under a synthetic nonce equal to
//! the keyed BLAKE2b-192 digest of the name. The same name and key therefore
//! always produce the same ciphertext, which lets two passes (or two
//! devices) compare remote names without decrypting them.
//!
//! Output: URL-safe base64 without padding of `nonce || ciphertext || tag`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use blake2::digest::consts::U24;
use blake2::digest::Mac;
use blake2::Blake2bMac;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};

use crate::key::EncryptionKey;

/// Length of the XChaCha20 nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Encrypts a single path segment
///
/// Empty names, `"."` and `".."` are returned unchanged.
pub fn encrypt_name(name: &str, key: &EncryptionKey) -> String {
    if is_passthrough(name) {
        return name.to_string();
    }

    let Some(nonce) = synthetic_nonce(name, key) else {
        return name.to_string();
    };
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    match cipher.encrypt(XNonce::from_slice(&nonce), name.as_bytes()) {
        Ok(ciphertext) => {
            let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
            sealed.extend_from_slice(&nonce);
            sealed.extend_from_slice(&ciphertext);
            URL_SAFE_NO_PAD.encode(sealed)
        }
        Err(_) => name.to_string(),
    }
}

/// Decrypts a segment, returning `None` if it was not produced with `key`
pub fn try_decrypt_name(encoded: &str, key: &EncryptionKey) -> Option<String> {
    if encoded.is_empty() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')).ok()?;
    if bytes.len() < NONCE_LEN {
        return None;
    }
    let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let plaintext = cipher.decrypt(XNonce::from_slice(nonce), ciphertext).ok()?;
    String::from_utf8(plaintext).ok()
}

/// Decrypts a segment, returning the input unchanged when it cannot be decrypted
pub fn decrypt_name(encoded: &str, key: &EncryptionKey) -> String {
    try_decrypt_name(encoded, key).unwrap_or_else(|| encoded.to_string())
}

fn is_passthrough(name: &str) -> bool {
    name.is_empty() || name == "." || name == ".."
}

fn synthetic_nonce(name: &str, key: &EncryptionKey) -> Option<[u8; NONCE_LEN]> {
    let mut mac =
        <Blake2bMac<U24> as blake2::digest::KeyInit>::new_from_slice(key.as_bytes()).ok()?;
    mac.update(name.as_bytes());
    let digest = mac.finalize().into_bytes();
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&digest);
    Some(nonce)
}
