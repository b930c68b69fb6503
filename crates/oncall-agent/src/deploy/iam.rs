//! IAM roles and policies for the handler and the agent

use anyhow::{bail, Context, Result};
use aws_sdk_iam::Client;
use oncall_agent_config::{foundation_model, AgentConfig, ProvisioningConfig, ResourceNames};
use tokio::time::sleep;
use tracing::debug;

use crate::policy::{
    bedrock_model_policy, handler_inline_policy, trust_policy, BEDROCK_SERVICE_PRINCIPAL,
    LAMBDA_BASIC_EXECUTION_POLICY_ARN, LAMBDA_SERVICE_PRINCIPAL,
};

/// Role the handler runs as; returns its ARN
pub async fn ensure_lambda_role(
    iam: &Client,
    names: &ResourceNames,
    provisioning: &ProvisioningConfig,
) -> Result<String> {
    let role = &names.lambda_role;

    let arn = match iam.get_role().role_name(role).send().await {
        Ok(output) => {
            println!("  Role {} already exists", role);
            output
                .role()
                .map(|r| r.arn().to_string())
                .with_context(|| format!("GetRole returned no role for {}", role))?
        }
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_no_such_entity_exception()) =>
        {
            println!("  Creating role {}", role);
            let created = iam
                .create_role()
                .role_name(role)
                .assume_role_policy_document(trust_policy(LAMBDA_SERVICE_PRINCIPAL).to_string())
                .send()
                .await
                .with_context(|| format!("Failed to create role {}", role))?;
            let arn = created
                .role()
                .map(|r| r.arn().to_string())
                .with_context(|| format!("CreateRole returned no role for {}", role))?;

            wait_for_role(iam, role, provisioning).await?;
            arn
        }
        Err(err) => return Err(err).with_context(|| format!("Failed to read role {}", role)),
    };

    // Both calls are idempotent; re-applying keeps older roles current
    iam.attach_role_policy()
        .role_name(role)
        .policy_arn(LAMBDA_BASIC_EXECUTION_POLICY_ARN)
        .send()
        .await
        .with_context(|| format!("Failed to attach basic execution policy to {}", role))?;
    iam.put_role_policy()
        .role_name(role)
        .policy_name(&names.lambda_inline_policy)
        .policy_document(handler_inline_policy().to_string())
        .send()
        .await
        .with_context(|| format!("Failed to put inline policy on {}", role))?;

    Ok(arn)
}

async fn wait_for_role(iam: &Client, role: &str, provisioning: &ProvisioningConfig) -> Result<()> {
    println!("  Waiting for role {} to exist...", role);

    for attempt in 1..=provisioning.role_wait_attempts {
        match iam.get_role().role_name(role).send().await {
            Ok(_) => return Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_entity_exception()) =>
            {
                debug!(role = %role, attempt, "Role not visible yet");
                sleep(provisioning.role_wait_delay()).await;
            }
            Err(err) => return Err(err).with_context(|| format!("Failed to read role {}", role)),
        }
    }

    bail!(
        "Role {} did not become visible after {} attempts",
        role,
        provisioning.role_wait_attempts
    )
}

/// Managed policy granting model access; returns its ARN
pub async fn ensure_bedrock_policy(
    iam: &Client,
    names: &ResourceNames,
    agent: &AgentConfig,
) -> Result<String> {
    let document = bedrock_model_policy(
        foundation_model(&agent.inference_profile),
        &agent.inference_profile,
    );

    match iam
        .create_policy()
        .policy_name(&names.bedrock_policy)
        .policy_document(document.to_string())
        .send()
        .await
    {
        Ok(output) => {
            println!("  IAM policy {} created", names.bedrock_policy);
            Ok(output
                .policy()
                .and_then(|p| p.arn())
                .map(str::to_string)
                .unwrap_or_else(|| names.bedrock_policy_arn()))
        }
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_entity_already_exists_exception()) =>
        {
            println!(
                "  IAM policy {} already exists, skipping creation",
                names.bedrock_policy
            );
            Ok(names.bedrock_policy_arn())
        }
        Err(err) => Err(err)
            .with_context(|| format!("Failed to create IAM policy {}", names.bedrock_policy)),
    }
}

/// Role the agent assumes, with the model policy attached; returns its ARN
pub async fn ensure_agent_role(
    iam: &Client,
    names: &ResourceNames,
    policy_arn: &str,
    provisioning: &ProvisioningConfig,
) -> Result<String> {
    let role = &names.agent_role;

    let created = iam
        .create_role()
        .role_name(role)
        .assume_role_policy_document(trust_policy(BEDROCK_SERVICE_PRINCIPAL).to_string())
        .send()
        .await;

    let arn = match created {
        Ok(output) => {
            println!("  Created role {}", role);
            output.role().map(|r| r.arn().to_string())
        }
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_entity_already_exists_exception()) =>
        {
            println!("  Role {} already exists", role);
            iam.get_role()
                .role_name(role)
                .send()
                .await
                .with_context(|| format!("Failed to read role {}", role))?
                .role()
                .map(|r| r.arn().to_string())
        }
        Err(err) => return Err(err).with_context(|| format!("Failed to create role {}", role)),
    }
    .with_context(|| format!("IAM returned no role for {}", role))?;

    // New roles are not immediately assumable by other services
    sleep(provisioning.iam_propagation()).await;

    iam.attach_role_policy()
        .role_name(role)
        .policy_arn(policy_arn)
        .send()
        .await
        .with_context(|| format!("Failed to attach {} to {}", policy_arn, role))?;

    Ok(arn)
}
