//! Administrator-credential providers.
//!
//! # Lifecycle
//!
//! 1. At startup, [`from_config`] builds the provider selected by
//!    `SECRET_BACKEND` and probes it once.
//! 2. Every encrypt/decrypt call fetches the latest credential through
//!    [`SecretProvider::current_secret`]. Nothing is cached between calls, so a
//!    credential rotation in the store takes effect on the next request.
//!
//! # Security invariants
//!
//! - The credential is **never** logged or included in traces; [`AdminSecret`]
//!   redacts itself in `Debug` and zeroes its buffer on drop.
//! - Store failures are reported immediately. Retry policy belongs to the caller.

pub mod secrets_manager;
pub mod sqlite;

pub use secrets_manager::SecretsManagerProvider;
pub use sqlite::SqliteSecretProvider;

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::config::{Config, SecretBackend};

/// Errors produced by a credential store.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The store is reachable but holds no credential.
    #[error("no administrator credential found")]
    NotFound,

    /// The store could not be queried.
    #[error("credential store error: {0}")]
    Backend(String),
}

/// The current administrator credential, used as PBKDF2 input.
pub struct AdminSecret(Zeroizing<String>);

impl AdminSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    /// Borrow the credential for key derivation.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the credential — not even in debug builds.
        f.write_str("AdminSecret([REDACTED])")
    }
}

/// Source of the most recently created administrator credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetch the latest credential from the store.
    async fn current_secret(&self) -> Result<AdminSecret, SecretError>;
}

/// Build the provider selected in `cfg` and check that the store answers.
///
/// An empty store is tolerated with a warning; an unreachable one aborts startup.
///
/// # Errors
///
/// Returns an error if the backend cannot be constructed or queried.
pub async fn from_config(cfg: &Config) -> Result<Arc<dyn SecretProvider>> {
    let provider: Arc<dyn SecretProvider> = match cfg.secret_backend {
        SecretBackend::Sqlite => {
            let path = cfg
                .database_path
                .as_deref()
                .context("DATABASE_PATH is required for the sqlite backend")?;
            Arc::new(SqliteSecretProvider::new(path, &cfg.admin_table))
        }
        SecretBackend::SecretsManager => {
            let secret_id = cfg
                .secret_id
                .clone()
                .context("SECRET_ID is required for the secrets-manager backend")?;
            Arc::new(SecretsManagerProvider::from_env(secret_id).await)
        }
    };

    match provider.current_secret().await {
        Ok(_) => info!(backend = %cfg.secret_backend, "credential store reachable"),
        Err(SecretError::NotFound) => {
            warn!(backend = %cfg.secret_backend, "credential store holds no administrator credential yet")
        }
        Err(e) => {
            return Err(anyhow::Error::new(e).context("failed to query the credential store"))
        }
    }

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_secret_redacted_in_debug() {
        let s = AdminSecret::new("hunter2hash");
        assert_eq!(format!("{s:?}"), "AdminSecret([REDACTED])");
        assert_eq!(s.expose(), "hunter2hash");
    }

    #[test]
    fn error_messages_do_not_carry_secrets() {
        assert_eq!(
            SecretError::NotFound.to_string(),
            "no administrator credential found"
        );
        assert!(SecretError::Backend("timeout".into())
            .to_string()
            .contains("timeout"));
    }

    #[tokio::test]
    async fn mock_provider_returns_configured_secret() {
        let mut mock = MockSecretProvider::new();
        mock.expect_current_secret()
            .times(1)
            .returning(|| Ok(AdminSecret::new("s3cr3t")));
        let secret = mock.current_secret().await.unwrap();
        assert_eq!(secret.expose(), "s3cr3t");
    }
}
