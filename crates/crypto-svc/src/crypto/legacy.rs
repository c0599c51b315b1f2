//! AES-256-CBC suite kept for envelopes produced by earlier deployments.
//!
//! **This suite has no integrity check.** A modified payload either fails
//! unpadding or decrypts to garbage; it is never detected as tampering. Adding
//! a MAC would change the wire format, so the suite is preserved as-is and
//! should only be enabled to read or produce legacy envelopes.
//!
//! Padding appends `n` bytes of value `n`, `n = 16 - len % 16`, so aligned
//! input still gains a full block. Unpadding trusts the final byte and checks
//! only that `1 <= n <= min(16, len)`; the other pad bytes are not inspected.

use aes::Aes256;
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::cipher::{CipherEngine, CipherError, CipherSuite};
use super::kdf::DerivedKey;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Byte length of a CBC initialisation vector.
pub const IV_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct AesCbcEngine;

fn check_iv(iv: &[u8]) -> Result<(), CipherError> {
    if iv.len() != IV_LEN {
        return Err(CipherError::InvalidNonceLength {
            expected: IV_LEN,
            got: iv.len(),
        });
    }
    Ok(())
}

/// Pad `data` to a multiple of [`BLOCK_SIZE`] with `n` bytes of value `n`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidInput`] for empty input.
fn pad(data: &[u8]) -> Result<Vec<u8>, CipherError> {
    if data.is_empty() {
        return Err(CipherError::InvalidInput);
    }
    let n = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut out = Vec::with_capacity(data.len() + n);
    out.extend_from_slice(data);
    out.resize(data.len() + n, n as u8);
    Ok(out)
}

/// Strip the padding added by [`pad`].
///
/// # Errors
///
/// Returns [`CipherError::InvalidPadding`] if the claimed pad length is zero,
/// longer than `data`, or longer than [`BLOCK_SIZE`].
fn unpad(mut data: Vec<u8>) -> Result<Vec<u8>, CipherError> {
    let n = *data.last().ok_or(CipherError::InvalidPadding)? as usize;
    if n == 0 || n > data.len() || n > BLOCK_SIZE {
        return Err(CipherError::InvalidPadding);
    }
    data.truncate(data.len() - n);
    Ok(data)
}

impl CipherEngine for AesCbcEngine {
    fn suite(&self) -> CipherSuite {
        CipherSuite::LegacyCbc
    }

    fn nonce_len(&self) -> usize {
        IV_LEN
    }

    fn encrypt(
        &self,
        key: &DerivedKey,
        iv: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        check_iv(iv)?;
        let padded = pad(plaintext)?;
        let enc = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CipherError::EncryptionFailed)?;
        Ok(enc.encrypt_padded_vec_mut::<NoPadding>(&padded))
    }

    fn decrypt(
        &self,
        key: &DerivedKey,
        iv: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        check_iv(iv)?;
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::InvalidPadding);
        }
        let dec = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
            .map_err(|_| CipherError::InvalidPadding)?;
        let padded = dec
            .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
            .map_err(|_| CipherError::InvalidPadding)?;
        unpad(padded)
    }
}
