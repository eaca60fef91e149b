//! Cryptographic primitives for MCP Storage.
//!
//! Provides the symmetric cipher behind the `x-api-key` gate, the ed25519
//! wallet that signs ledger uploads, and domain-separated BLAKE3 digests over
//! upload contents.
//!
//! Primitives come from `blake3`, `ed25519-dalek` and `chacha20poly1305`;
//! nothing here implements cryptography by hand.

pub mod cipher;
pub mod hasher;
pub mod signer;

pub use cipher::{decrypt, encrypt, CipherKey, DecryptError, EncryptError};
pub use hasher::ContentHasher;
pub use signer::{Signature, SignatureError, VerifyingKey, WalletKey};
