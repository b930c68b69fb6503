// Secrets Manager backed secret store

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use oncall_agent_core::{CheckError, ResolvedSecret, SecretStore, WarehouseSecret};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn resolve(&self, secret_id: &str) -> Result<ResolvedSecret, CheckError> {
        debug!(secret_id = %secret_id, "Fetching warehouse secret");

        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| CheckError::SecretUnavailable {
                secret_id: secret_id.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let payload = output
            .secret_string()
            .ok_or_else(|| CheckError::MalformedSecret {
                secret_id: secret_id.to_string(),
                reason: "secret has no SecretString (binary secrets are not supported)"
                    .to_string(),
            })?;
        let secret = WarehouseSecret::parse(secret_id, payload)?;

        // A full ARN may have been configured directly
        let arn = output
            .arn()
            .map(str::to_string)
            .unwrap_or_else(|| secret_id.to_string());

        Ok(ResolvedSecret { arn, secret })
    }
}
