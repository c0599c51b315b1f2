//! AES-256-GCM suite.
//!
//! Output is `ciphertext || tag` with no associated data, matching what
//! earlier deployments of this service produced.

use aes_gcm::{
    aead::{consts::U12, Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use super::cipher::{CipherEngine, CipherError, CipherSuite};
use super::kdf::DerivedKey;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmEngine;

impl AesGcmEngine {
    fn nonce(nonce: &[u8]) -> Result<&Nonce<U12>, CipherError> {
        // Nonce::from_slice panics on a length mismatch.
        if nonce.len() != NONCE_LEN {
            return Err(CipherError::InvalidNonceLength {
                expected: NONCE_LEN,
                got: nonce.len(),
            });
        }
        Ok(Nonce::from_slice(nonce))
    }
}

impl CipherEngine for AesGcmEngine {
    fn suite(&self) -> CipherSuite {
        CipherSuite::Aead
    }

    fn nonce_len(&self) -> usize {
        NONCE_LEN
    }

    fn encrypt(
        &self,
        key: &DerivedKey,
        nonce: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let nonce = Self::nonce(nonce)?;
        let cipher = Aes256Gcm::new(key.as_bytes().into());
        cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CipherError::EncryptionFailed)
    }

    /// The tag is verified before any plaintext is returned; on failure the
    /// caller gets only [`CipherError::AuthenticationFailed`].
    fn decrypt(
        &self,
        key: &DerivedKey,
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let nonce = Self::nonce(nonce)?;
        let cipher = Aes256Gcm::new(key.as_bytes().into());
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::AuthenticationFailed)
    }
}
