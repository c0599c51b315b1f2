//! Configuration loading and validation for the crypto service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::{CipherSuite, KdfParams};
use crate::secret::sqlite::is_sql_identifier;

/// Where the administrator credential is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretBackend {
    /// Latest row of the admin table in a SQLite database.
    Sqlite,
    /// `AWSCURRENT` version of an AWS Secrets Manager string secret.
    SecretsManager,
}

impl fmt::Display for SecretBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SecretBackend::Sqlite => "sqlite",
            SecretBackend::SecretsManager => "secrets-manager",
        })
    }
}

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Cipher suite produced and consumed by this instance.
    #[serde(default)]
    pub cipher_suite: CipherSuite,

    /// PBKDF2 iteration count used for every key derivation.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Credential store backend.
    #[serde(default = "default_secret_backend")]
    pub secret_backend: SecretBackend,

    /// SQLite database holding the admin table. **Required** for `sqlite`.
    #[serde(default)]
    pub database_path: Option<String>,

    /// Table holding `password` / `created_at` rows.
    #[serde(default = "default_admin_table")]
    pub admin_table: String,

    /// Secrets Manager secret id or ARN. **Required** for `secrets-manager`.
    #[serde(default)]
    pub secret_id: Option<String>,

    /// Upper bound on a single credential-store round trip, in milliseconds.
    #[serde(default = "default_secret_fetch_timeout_ms")]
    pub secret_fetch_timeout_ms: u64,

    /// OTLP endpoint for span export. Spans are only logged locally when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8094
}
fn default_kdf_iterations() -> u32 {
    100_000
}
fn default_secret_backend() -> SecretBackend {
    SecretBackend::Sqlite
}
fn default_admin_table() -> String {
    "admins".into()
}
fn default_secret_fetch_timeout_ms() -> u64 {
    5_000
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Key-derivation parameters handed to [`crate::crypto::KeyDerivation`].
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.kdf_iterations,
        }
    }

    /// Per-call deadline for fetching the administrator credential.
    pub fn secret_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.secret_fetch_timeout_ms)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.kdf_iterations == 0 {
            anyhow::bail!("KDF_ITERATIONS must be > 0");
        }
        if self.secret_fetch_timeout_ms == 0 {
            anyhow::bail!("SECRET_FETCH_TIMEOUT_MS must be > 0");
        }
        match self.secret_backend {
            SecretBackend::Sqlite => {
                ensure_present(&self.database_path, "DATABASE_PATH")?;
                if !is_sql_identifier(&self.admin_table) {
                    anyhow::bail!("ADMIN_TABLE must be a plain SQL identifier");
                }
            }
            SecretBackend::SecretsManager => ensure_present(&self.secret_id, "SECRET_ID")?,
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            if endpoint.trim().is_empty() {
                anyhow::bail!("OTEL_EXPORTER_OTLP_ENDPOINT must not be blank when set");
            }
        }
        Ok(())
    }
}

fn ensure_present(value: &Option<String>, name: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => anyhow::bail!("{name} is required and must not be empty"),
    }
}
