//! [`EnvelopeService`]: the Encrypt / Decrypt operations.
//!
//! Each call is one independent transaction:
//!
//! ```text
//! encrypt: fetch secret → derive(fresh salt) → fresh nonce → seal → encode
//! decrypt: decode → fetch secret → derive(envelope salt) → open → UTF-8
//! ```
//!
//! No key material or credential is retained between calls. Key derivation
//! and the cipher transform run on the blocking pool so a high PBKDF2
//! iteration count does not stall the async workers.

use std::sync::Arc;
use std::time::Duration;

use common::ServiceError;
use thiserror::Error;
use tracing::{debug, error, warn};
use zeroize::Zeroizing;

use crate::crypto::kdf::SALT_LEN;
use crate::crypto::{
    fill_random, CipherEngine, CipherError, CipherSuite, Envelope, KdfParams, KeyDerivation,
    RandomUnavailable,
};
use crate::secret::{AdminSecret, SecretProvider};

/// Failure categories of the envelope subsystem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The credential store is unreachable, empty, or timed out.
    #[error("administrator secret unavailable")]
    SecretUnavailable,

    /// Wrong segment count, invalid hex, or a salt/nonce of the wrong size.
    #[error("malformed envelope")]
    MalformedEnvelope,

    /// The AEAD tag did not verify.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Legacy-suite padding out of range.
    #[error("invalid padding")]
    InvalidPadding,

    /// Plaintext rejected by the configured suite.
    #[error("invalid input")]
    InvalidInput,

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted data is not valid text")]
    InvalidEncoding,

    /// The OS CSPRNG failed; nothing was encrypted.
    #[error("secure random source unavailable")]
    RandomUnavailable,

    /// Unexpected internal failure.
    #[error("internal error")]
    Internal,
}

impl From<CipherError> for EnvelopeError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::InvalidNonceLength { .. } => EnvelopeError::MalformedEnvelope,
            CipherError::AuthenticationFailed => EnvelopeError::AuthenticationFailed,
            CipherError::InvalidPadding => EnvelopeError::InvalidPadding,
            CipherError::InvalidInput => EnvelopeError::InvalidInput,
            CipherError::EncryptionFailed => EnvelopeError::Internal,
        }
    }
}

impl From<RandomUnavailable> for EnvelopeError {
    fn from(_: RandomUnavailable) -> Self {
        EnvelopeError::RandomUnavailable
    }
}

/// Caller-facing mapping.
///
/// Every failure after the envelope has been parsed collapses into one
/// message so that responses cannot be used to probe ciphertext validity.
impl From<EnvelopeError> for ServiceError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::MalformedEnvelope => ServiceError::BadRequest("invalid ciphertext".into()),
            EnvelopeError::InvalidInput => {
                ServiceError::BadRequest("plaintext is not accepted by this cipher suite".into())
            }
            EnvelopeError::AuthenticationFailed
            | EnvelopeError::InvalidPadding
            | EnvelopeError::InvalidEncoding => {
                ServiceError::DecryptionFailure("failed to decrypt the data".into())
            }
            EnvelopeError::SecretUnavailable => {
                ServiceError::Internal("failed to get the admin secret".into())
            }
            EnvelopeError::RandomUnavailable | EnvelopeError::Internal => {
                ServiceError::Internal("internal error".into())
            }
        }
    }
}

/// Orchestrates the secret provider, key derivation, cipher, and codec.
///
/// Cheap to clone; all clones share the same provider and engine.
#[derive(Clone)]
pub struct EnvelopeService {
    secrets: Arc<dyn SecretProvider>,
    kdf: KeyDerivation,
    engine: Arc<dyn CipherEngine>,
    secret_fetch_timeout: Duration,
}

impl EnvelopeService {
    /// Create a service bound to one cipher suite for its whole lifetime.
    pub fn new(
        secrets: Arc<dyn SecretProvider>,
        kdf_params: KdfParams,
        suite: CipherSuite,
        secret_fetch_timeout: Duration,
    ) -> Self {
        Self {
            secrets,
            kdf: KeyDerivation::new(kdf_params),
            engine: suite.engine(),
            secret_fetch_timeout,
        }
    }

    /// The suite this instance produces and consumes.
    pub fn suite(&self) -> CipherSuite {
        self.engine.suite()
    }

    /// Encrypt `plaintext` under a key derived from the current admin secret.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::SecretUnavailable`] if the credential cannot be fetched,
    /// [`EnvelopeError::InvalidInput`] for empty input under the legacy suite,
    /// [`EnvelopeError::RandomUnavailable`] if salt or nonce generation fails.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String, EnvelopeError> {
        let secret = self.fetch_secret().await?;
        let this = self.clone();
        let plaintext = Zeroizing::new(plaintext.as_bytes().to_vec());
        run_blocking(move || this.seal(&secret, &plaintext)).await
    }

    /// Decrypt an envelope produced by [`EnvelopeService::encrypt`].
    ///
    /// The envelope is parsed before the credential store is contacted.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::MalformedEnvelope`] on structural errors,
    /// [`EnvelopeError::SecretUnavailable`] if the credential cannot be fetched,
    /// [`EnvelopeError::AuthenticationFailed`] / [`EnvelopeError::InvalidPadding`]
    /// from the cipher, and [`EnvelopeError::InvalidEncoding`] for non-UTF-8 output.
    pub async fn decrypt(&self, ciphertext: &str) -> Result<String, EnvelopeError> {
        let envelope: Envelope = ciphertext.parse().map_err(|e| {
            debug!(error = %e, "rejecting envelope");
            EnvelopeError::MalformedEnvelope
        })?;
        let secret = self.fetch_secret().await?;
        let this = self.clone();
        run_blocking(move || this.open(&secret, &envelope)).await
    }

    /// Synchronous core of [`EnvelopeService::encrypt`].
    pub fn seal(&self, secret: &AdminSecret, plaintext: &[u8]) -> Result<String, EnvelopeError> {
        let (key, salt) = self.kdf.derive(secret.expose(), None)?;

        let mut nonce = vec![0u8; self.engine.nonce_len()];
        fill_random(&mut nonce)?;

        let payload = self.engine.encrypt(&key, &nonce, plaintext)?;
        Ok(Envelope::new(salt, nonce, payload).encode())
    }

    /// Synchronous core of [`EnvelopeService::decrypt`].
    pub fn open(&self, secret: &AdminSecret, envelope: &Envelope) -> Result<String, EnvelopeError> {
        let salt: &[u8; SALT_LEN] = envelope
            .salt
            .as_slice()
            .try_into()
            .map_err(|_| EnvelopeError::MalformedEnvelope)?;

        let (key, _) = self.kdf.derive(secret.expose(), Some(salt))?;
        let plaintext = self
            .engine
            .decrypt(&key, &envelope.nonce, &envelope.payload)
            .map_err(|e| {
                debug!(error = %e, suite = %self.engine.suite(), "decryption failed");
                EnvelopeError::from(e)
            })?;

        String::from_utf8(plaintext).map_err(|e| {
            // Zero the recovered bytes before discarding them.
            drop(Zeroizing::new(e.into_bytes()));
            EnvelopeError::InvalidEncoding
        })
    }

    async fn fetch_secret(&self) -> Result<AdminSecret, EnvelopeError> {
        match tokio::time::timeout(self.secret_fetch_timeout, self.secrets.current_secret()).await
        {
            Ok(Ok(secret)) => Ok(secret),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to fetch administrator secret");
                Err(EnvelopeError::SecretUnavailable)
            }
            Err(_) => {
                warn!(
                    timeout = ?self.secret_fetch_timeout,
                    "administrator secret fetch timed out"
                );
                Err(EnvelopeError::SecretUnavailable)
            }
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, EnvelopeError>
where
    F: FnOnce() -> Result<T, EnvelopeError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(error = %e, "envelope task failed");
        EnvelopeError::Internal
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::aead;
    use crate::secret::{MockSecretProvider, SecretError};

    const SECRET: &str = "hunter2hash";

    fn params() -> KdfParams {
        KdfParams { iterations: 1_000 }
    }

    fn service_with(mock: MockSecretProvider, suite: CipherSuite) -> EnvelopeService {
        EnvelopeService::new(Arc::new(mock), params(), suite, Duration::from_secs(5))
    }

    fn service(suite: CipherSuite) -> EnvelopeService {
        let mut mock = MockSecretProvider::new();
        mock.expect_current_secret()
            .returning(|| Ok(AdminSecret::new(SECRET)));
        service_with(mock, suite)
    }

    /// Re-encode `envelope` after flipping one bit of its payload.
    fn flip_payload_bit(envelope: &str, byte: usize, bit: u8) -> String {
        let mut env: Envelope = envelope.parse().unwrap();
        env.payload[byte] ^= 1 << bit;
        env.encode()
    }

    #[tokio::test]
    async fn hello_world_round_trip() {
        let svc = service(CipherSuite::Aead);
        let envelope = svc.encrypt("hello world").await.unwrap();

        let parts: Vec<&str> = envelope.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 16);
        assert_eq!(parts[1].len(), aead::NONCE_LEN * 2);
        assert!(parts
            .iter()
            .all(|p| p.chars().all(|c| c.is_ascii_hexdigit())));

        assert_eq!(svc.decrypt(&envelope).await.unwrap(), "hello world");
    }

    #[tokio::test]
    async fn aead_round_trips_edge_lengths() {
        let svc = service(CipherSuite::Aead);
        for p in ["", "x", "a string that covers several sixteen-byte blocks of input"] {
            let envelope = svc.encrypt(p).await.unwrap();
            assert_eq!(svc.decrypt(&envelope).await.unwrap(), p);
        }
    }

    #[tokio::test]
    async fn legacy_round_trips_and_pads_aligned_input() {
        let svc = service(CipherSuite::LegacyCbc);
        let aligned = "0123456789abcdef";
        let envelope = svc.encrypt(aligned).await.unwrap();
        let env: Envelope = envelope.parse().unwrap();
        assert_eq!(env.nonce.len(), 16);
        assert_eq!(env.payload.len(), 32);
        assert_eq!(svc.decrypt(&envelope).await.unwrap(), aligned);

        for p in ["x", "a string that covers several sixteen-byte blocks of input"] {
            let envelope = svc.encrypt(p).await.unwrap();
            assert_eq!(svc.decrypt(&envelope).await.unwrap(), p);
        }
    }

    #[tokio::test]
    async fn legacy_rejects_empty_plaintext() {
        let svc = service(CipherSuite::LegacyCbc);
        assert_eq!(svc.encrypt("").await, Err(EnvelopeError::InvalidInput));
    }

    #[tokio::test]
    async fn same_plaintext_gives_distinct_envelopes() {
        let svc = service(CipherSuite::Aead);
        let a = svc.encrypt("repeat").await.unwrap();
        let b = svc.encrypt("repeat").await.unwrap();
        assert_ne!(a, b);
        assert_ne!(a.split('-').next(), b.split('-').next());
        assert_eq!(svc.decrypt(&a).await.unwrap(), "repeat");
        assert_eq!(svc.decrypt(&b).await.unwrap(), "repeat");
    }

    #[tokio::test]
    async fn every_payload_bit_flip_fails_authentication() {
        let svc = service(CipherSuite::Aead);
        let envelope = svc.encrypt("hi").await.unwrap();
        let payload_len = envelope.parse::<Envelope>().unwrap().payload.len();
        for byte in 0..payload_len {
            for bit in 0..8 {
                let tampered = flip_payload_bit(&envelope, byte, bit);
                assert_eq!(
                    svc.decrypt(&tampered).await,
                    Err(EnvelopeError::AuthenticationFailed),
                    "byte {byte} bit {bit}"
                );
            }
        }
    }

    #[tokio::test]
    async fn malformed_envelopes_rejected_without_store_lookup() {
        let mut mock = MockSecretProvider::new();
        mock.expect_current_secret().never();
        let svc = service_with(mock, CipherSuite::Aead);

        assert_eq!(svc.decrypt("abc").await, Err(EnvelopeError::MalformedEnvelope));
        assert_eq!(
            svc.decrypt("zz-11-22").await,
            Err(EnvelopeError::MalformedEnvelope)
        );
    }

    #[tokio::test]
    async fn wrong_salt_or_nonce_length_is_malformed() {
        let svc = service(CipherSuite::Aead);
        // 4-byte salt.
        assert_eq!(
            svc.decrypt("00112233-000102030405060708090a0b-00").await,
            Err(EnvelopeError::MalformedEnvelope)
        );
        // 16-byte nonce under the AEAD suite.
        assert_eq!(
            svc.decrypt("0011223344556677-000102030405060708090a0b0c0d0e0f-00")
                .await,
            Err(EnvelopeError::MalformedEnvelope)
        );
    }

    #[tokio::test]
    async fn rotated_secret_cannot_open_old_envelopes() {
        let old = service(CipherSuite::Aead);
        let envelope = old.encrypt("before rotation").await.unwrap();

        let mut mock = MockSecretProvider::new();
        mock.expect_current_secret()
            .returning(|| Ok(AdminSecret::new("rotated-hash")));
        let rotated = service_with(mock, CipherSuite::Aead);
        assert_eq!(
            rotated.decrypt(&envelope).await,
            Err(EnvelopeError::AuthenticationFailed)
        );
    }

    #[tokio::test]
    async fn secret_fetched_on_every_call() {
        let mut mock = MockSecretProvider::new();
        mock.expect_current_secret()
            .times(3)
            .returning(|| Ok(AdminSecret::new(SECRET)));
        let svc = service_with(mock, CipherSuite::Aead);

        let a = svc.encrypt("one").await.unwrap();
        svc.encrypt("two").await.unwrap();
        svc.decrypt(&a).await.unwrap();
    }

    #[tokio::test]
    async fn store_failure_is_secret_unavailable() {
        let mut mock = MockSecretProvider::new();
        mock.expect_current_secret()
            .returning(|| Err(SecretError::Backend("connection refused".into())));
        let svc = service_with(mock, CipherSuite::Aead);
        assert_eq!(svc.encrypt("x").await, Err(EnvelopeError::SecretUnavailable));
    }

    #[tokio::test]
    async fn empty_store_is_secret_unavailable() {
        let mut mock = MockSecretProvider::new();
        mock.expect_current_secret()
            .returning(|| Err(SecretError::NotFound));
        let svc = service_with(mock, CipherSuite::Aead);
        assert_eq!(
            svc.decrypt("0011223344556677-000102030405060708090a0b-00").await,
            Err(EnvelopeError::SecretUnavailable)
        );
    }

    struct StalledStore;

    #[async_trait::async_trait]
    impl SecretProvider for StalledStore {
        async fn current_secret(&self) -> Result<AdminSecret, SecretError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(AdminSecret::new(SECRET))
        }
    }

    #[tokio::test]
    async fn slow_store_times_out_as_secret_unavailable() {
        let svc = EnvelopeService::new(
            Arc::new(StalledStore),
            params(),
            CipherSuite::Aead,
            Duration::from_millis(20),
        );
        assert_eq!(svc.encrypt("x").await, Err(EnvelopeError::SecretUnavailable));
    }

    #[tokio::test]
    async fn opens_envelope_sealed_by_another_implementation() {
        // PBKDF2-HMAC-SHA256 (1000 rounds) + AES-256-GCM, produced outside this crate.
        let envelope = "0001020304050607-000102030405060708090a0b-\
                        6a2f3fdba28f9c49342f8ba13d7aa8f9863e8df8d7a85b9cf917fc";
        let svc = service(CipherSuite::Aead);
        assert_eq!(svc.decrypt(envelope).await.unwrap(), "hello world");
    }

    #[test]
    fn non_utf8_plaintext_is_invalid_encoding() {
        let svc = service(CipherSuite::Aead);
        let secret = AdminSecret::new(SECRET);
        let envelope = svc.seal(&secret, &[0xff, 0xfe, 0x00]).unwrap();
        let env: Envelope = envelope.parse().unwrap();
        assert_eq!(svc.open(&secret, &env), Err(EnvelopeError::InvalidEncoding));
    }

    #[test]
    fn legacy_padding_failure_surfaces_as_invalid_padding() {
        let svc = service(CipherSuite::LegacyCbc);
        let secret = AdminSecret::new(SECRET);
        let mut env: Envelope = svc.seal(&secret, b"pad me").unwrap().parse().unwrap();
        // A wrong secret decrypts the final block to noise; retry a few salts
        // until the claimed pad length is out of range.
        let mut saw_invalid_padding = false;
        for i in 0..32u8 {
            env.salt[0] = i;
            if svc.open(&secret, &env) == Err(EnvelopeError::InvalidPadding) {
                saw_invalid_padding = true;
                break;
            }
        }
        assert!(saw_invalid_padding);
    }

    #[test]
    fn decrypt_failures_share_one_caller_message() {
        let messages: Vec<String> = [
            EnvelopeError::AuthenticationFailed,
            EnvelopeError::InvalidPadding,
            EnvelopeError::InvalidEncoding,
        ]
        .into_iter()
        .map(|e| ServiceError::from(e).to_string())
        .collect();
        assert!(messages.iter().all(|m| m == &messages[0]));
    }

    #[test]
    fn error_categories_map_to_status_codes() {
        assert_eq!(
            ServiceError::from(EnvelopeError::MalformedEnvelope).http_status(),
            400
        );
        assert_eq!(
            ServiceError::from(EnvelopeError::SecretUnavailable).http_status(),
            500
        );
        assert_eq!(
            ServiceError::from(EnvelopeError::RandomUnavailable).http_status(),
            500
        );
    }
}
