//! PBKDF2-HMAC-SHA256 key derivation from the administrator secret.

use std::fmt;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{fill_random, RandomUnavailable};

/// Byte length of a derived AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the per-envelope salt.
pub const SALT_LEN: usize = 8;

/// Immutable key-derivation parameters, built once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2 iteration count. Must be non-zero.
    pub iterations: u32,
}

/// A 32-byte symmetric key that lives only for one encrypt/decrypt call.
///
/// The buffer is zeroed on drop and never printed.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Turns a secret string plus an optional salt into a [`DerivedKey`].
#[derive(Debug, Clone, Copy)]
pub struct KeyDerivation {
    params: KdfParams,
}

impl KeyDerivation {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Derive a key from `secret`.
    ///
    /// With `salt = None` a fresh random salt is generated (encrypt path).
    /// With `Some(salt)` the derivation is fully deterministic, which is how the
    /// decrypt path reproduces the key from the salt stored in the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`RandomUnavailable`] if a fresh salt was needed and the OS
    /// CSPRNG failed.
    pub fn derive(
        &self,
        secret: &str,
        salt: Option<&[u8; SALT_LEN]>,
    ) -> Result<(DerivedKey, [u8; SALT_LEN]), RandomUnavailable> {
        let salt = match salt {
            Some(s) => *s,
            None => {
                let mut fresh = [0u8; SALT_LEN];
                fill_random(&mut fresh)?;
                fresh
            }
        };

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), &salt, self.params.iterations, &mut key[..]);
        Ok((DerivedKey(key), salt))
    }
}
