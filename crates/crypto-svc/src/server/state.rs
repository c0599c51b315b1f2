//! Shared application state injected into every Axum handler.

use crate::service::EnvelopeService;

/// Application state shared across all request handlers.
///
/// Cloned per request by Axum; the service is `Arc`-backed so this is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Encrypt / Decrypt orchestration bound to the configured suite.
    pub service: EnvelopeService,
}

impl AppState {
    pub fn new(service: EnvelopeService) -> Self {
        Self { service }
    }
}

#[cfg(test)]
impl AppState {
    /// State backed by a mock provider that always returns `secret`.
    pub(crate) fn with_secret(secret: &'static str, suite: crate::crypto::CipherSuite) -> Self {
        use std::sync::Arc;
        use std::time::Duration;

        use crate::crypto::KdfParams;
        use crate::secret::{AdminSecret, MockSecretProvider};

        let mut mock = MockSecretProvider::new();
        mock.expect_current_secret()
            .returning(move || Ok(AdminSecret::new(secret)));
        Self::new(EnvelopeService::new(
            Arc::new(mock),
            KdfParams { iterations: 1_000 },
            suite,
            Duration::from_secs(5),
        ))
    }
}
