//! Envelope-cipher primitives: key derivation, the envelope codec, and the two
//! cipher suites.
//!
//! This module is intentionally free of HTTP and credential-store dependencies.
//! It provides the low-level operations orchestrated by [`crate::service`].
//!
//! # Ciphertext format
//!
//! ```text
//! <hex(salt)>-<hex(nonce_or_iv)>-<hex(payload)>
//! ```
//!
//! The salt is always [`kdf::SALT_LEN`] bytes. The nonce length and payload
//! layout depend on the [`CipherSuite`] the service was started with; the
//! envelope itself does not record the suite.

pub mod aead;
pub mod cipher;
pub mod envelope;
pub mod kdf;
pub mod legacy;

pub use cipher::{CipherEngine, CipherError, CipherSuite};
pub use envelope::{CodecError, Envelope};
pub use kdf::{DerivedKey, KdfParams, KeyDerivation};

use aes_gcm::aead::{rand_core::RngCore, OsRng};
use thiserror::Error;

/// The OS CSPRNG could not supply the requested bytes.
#[derive(Debug, Error)]
#[error("secure random source unavailable")]
pub struct RandomUnavailable;

/// Fill `buf` from the OS CSPRNG.
///
/// `OsRng` is stateless and safe to call from any number of concurrent tasks.
///
/// # Errors
///
/// Returns [`RandomUnavailable`] instead of leaving `buf` partially filled.
pub fn fill_random(buf: &mut [u8]) -> Result<(), RandomUnavailable> {
    OsRng.try_fill_bytes(buf).map_err(|_| RandomUnavailable)
}
