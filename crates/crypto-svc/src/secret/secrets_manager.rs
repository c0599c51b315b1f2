//! [`SecretsManagerProvider`]: reads the `AWSCURRENT` version of a string secret.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::DisplayErrorContext;

use super::{AdminSecret, SecretError, SecretProvider};

/// Version stage Secrets Manager attaches to the most recent secret value.
const CURRENT_STAGE: &str = "AWSCURRENT";

/// Credential provider backed by AWS Secrets Manager.
///
/// Credentials for the SDK itself are resolved via the standard AWS chain.
#[derive(Clone)]
pub struct SecretsManagerProvider {
    client: aws_sdk_secretsmanager::Client,
    secret_id: String,
}

impl SecretsManagerProvider {
    /// Build a provider using the default AWS SDK configuration.
    pub async fn from_env(secret_id: String) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: aws_sdk_secretsmanager::Client::new(&config),
            secret_id,
        }
    }
}

#[async_trait]
impl SecretProvider for SecretsManagerProvider {
    async fn current_secret(&self) -> Result<AdminSecret, SecretError> {
        let resp = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .version_stage(CURRENT_STAGE)
            .send()
            .await
            .map_err(|e| {
                SecretError::Backend(format!(
                    "GetSecretValue failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        match resp.secret_string() {
            Some(s) if !s.is_empty() => Ok(AdminSecret::new(s)),
            _ => Err(SecretError::NotFound),
        }
    }
}
