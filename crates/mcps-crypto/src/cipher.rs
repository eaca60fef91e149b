//! Symmetric cipher for short secrets such as the API key.
//!
//! Wire format: `base64(nonce || ciphertext || tag)` using ChaCha20-Poly1305
//! with a fresh random 96-bit nonce per message. The 256-bit key is derived
//! from the process-wide shared secret with BLAKE3's key derivation mode.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::RngCore;

/// Nonce length for ChaCha20-Poly1305 (12 bytes).
pub const NONCE_LEN: usize = 12;

/// Poly1305 authentication tag length (16 bytes).
pub const TAG_LEN: usize = 16;

const KEY_DERIVATION_CONTEXT: &str = "mcps 2024-01-01 api-key cipher v1";

/// 256-bit cipher key.
#[derive(Clone)]
pub struct CipherKey([u8; 32]);

impl CipherKey {
    /// Derive a key from a shared secret string.
    pub fn derive(secret: &str) -> Self {
        Self(blake3::derive_key(KEY_DERIVATION_CONTEXT, secret.as_bytes()))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CipherKey(<redacted>)")
    }
}

/// Errors from [`encrypt`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncryptError {
    #[error("plaintext could not be sealed")]
    Seal,
}

/// Errors from [`decrypt`]. Callers at the HTTP boundary must not expose
/// which variant occurred.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecryptError {
    #[error("ciphertext is not valid base64")]
    Encoding,

    #[error("ciphertext too short: {0} bytes")]
    Truncated(usize),

    #[error("authentication failed")]
    Authentication,

    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

/// Encrypt `plaintext` under `key`.
pub fn encrypt(plaintext: &str, key: &CipherKey) -> Result<String, EncryptError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let sealed = key
        .cipher()
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| EncryptError::Seal)?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(STANDARD.encode(out))
}

/// Decrypt a value produced by [`encrypt`].
///
/// Never panics on hostile input: malformed encodings, truncated buffers and
/// wrong keys all come back as a [`DecryptError`].
pub fn decrypt(ciphertext: &str, key: &CipherKey) -> Result<String, DecryptError> {
    let raw = STANDARD
        .decode(ciphertext.trim())
        .map_err(|_| DecryptError::Encoding)?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(DecryptError::Truncated(raw.len()));
    }

    let (nonce, sealed) = raw.split_at(NONCE_LEN);
    let opened = key
        .cipher()
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| DecryptError::Authentication)?;

    String::from_utf8(opened).map_err(|_| DecryptError::Utf8)
}
