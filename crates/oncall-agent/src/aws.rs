//! Shared AWS session: one SDK config, the clients built from it, and the
//! caller's account and region

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use oncall_agent_config::{AppConfig, ResourceNames};
use tracing::debug;

pub struct AwsContext {
    pub region: String,
    pub account_id: String,
    pub iam: aws_sdk_iam::Client,
    pub lambda: aws_sdk_lambda::Client,
    pub agents: aws_sdk_bedrockagent::Client,
    pub runtime: aws_sdk_bedrockagentruntime::Client,
}

impl AwsContext {
    /// Load credentials from the default chain; `region` overrides the
    /// profile/environment region when given
    pub async fn load(region: Option<&str>) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk = loader.load().await;

        let region = sdk
            .region()
            .map(|r| r.to_string())
            .context("No AWS region configured. Pass --region or set AWS_REGION")?;

        let identity = aws_sdk_sts::Client::new(&sdk)
            .get_caller_identity()
            .send()
            .await
            .context("Failed to resolve caller identity (are AWS credentials configured?)")?;
        let account_id = identity
            .account()
            .map(str::to_string)
            .context("GetCallerIdentity returned no account id")?;

        debug!(region = %region, account_id = %account_id, "Resolved AWS identity");

        Ok(Self {
            iam: aws_sdk_iam::Client::new(&sdk),
            lambda: aws_sdk_lambda::Client::new(&sdk),
            agents: aws_sdk_bedrockagent::Client::new(&sdk),
            runtime: aws_sdk_bedrockagentruntime::Client::new(&sdk),
            region,
            account_id,
        })
    }

    pub fn names(&self, config: &AppConfig) -> ResourceNames {
        ResourceNames::derive(config, &self.region, &self.account_id)
    }
}
