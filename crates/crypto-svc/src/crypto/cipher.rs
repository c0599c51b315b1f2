//! The [`CipherEngine`] seam and the [`CipherSuite`] selector.
//!
//! A service instance picks one suite at startup and only ever produces and
//! consumes that suite's envelopes. There is no per-call negotiation and no
//! auto-detection across suites.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use super::aead::AesGcmEngine;
use super::kdf::DerivedKey;
use super::legacy::AesCbcEngine;

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The nonce/IV taken from the envelope is the wrong size for this suite.
    #[error("invalid nonce length: expected {expected} bytes, got {got}")]
    InvalidNonceLength { expected: usize, got: usize },

    /// The AEAD tag did not verify. No plaintext is released.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Legacy-suite padding is out of range or the ciphertext is not block aligned.
    #[error("invalid padding")]
    InvalidPadding,

    /// The plaintext is not acceptable to this suite (empty input for CBC).
    #[error("invalid input")]
    InvalidInput,

    /// Internal AEAD failure while sealing; unreachable with a valid key and nonce.
    #[error("encryption failed")]
    EncryptionFailed,
}

/// Symmetric transform used by the envelope service.
///
/// Implementations hold no per-call state and are shared across concurrent
/// requests.
pub trait CipherEngine: Send + Sync {
    /// The suite this engine implements.
    fn suite(&self) -> CipherSuite;

    /// Required nonce/IV length in bytes.
    fn nonce_len(&self) -> usize;

    /// Encrypt `plaintext` under `key` and `nonce`.
    fn encrypt(
        &self,
        key: &DerivedKey,
        nonce: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CipherError>;

    /// Decrypt `ciphertext` under `key` and `nonce`.
    fn decrypt(
        &self,
        key: &DerivedKey,
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CipherError>;
}

/// The two mutually exclusive cipher suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherSuite {
    /// AES-256-GCM, 12-byte nonce, tag appended to the ciphertext.
    #[default]
    Aead,
    /// AES-256-CBC, 16-byte IV, block padding. Confidentiality only.
    LegacyCbc,
}

impl CipherSuite {
    /// Stable name used in configuration and the health endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherSuite::Aead => "aead",
            CipherSuite::LegacyCbc => "legacy-cbc",
        }
    }

    /// Build the engine for this suite. Called once per service instance.
    pub fn engine(self) -> Arc<dyn CipherEngine> {
        match self {
            CipherSuite::Aead => Arc::new(AesGcmEngine),
            CipherSuite::LegacyCbc => Arc::new(AesCbcEngine),
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
