//! The handler function and the permission letting the agent invoke it

use anyhow::{bail, Context, Result};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{Architecture, Environment, LastUpdateStatus, Runtime};
use aws_sdk_lambda::Client;
use oncall_agent_config::{AppConfig, ResourceNames, SECRET_ID_ENV};
use tokio::time::{sleep, Instant};
use tracing::debug;

use super::package::{read_zip, PackageSource};
use crate::policy::BEDROCK_SERVICE_PRINCIPAL;

/// Custom runtimes look for an executable with this name
const HANDLER: &str = "bootstrap";
const PERMISSION_STATEMENT_ID: &str = "allow_bedrock";

fn environment(config: &AppConfig) -> Environment {
    Environment::builder()
        .variables(SECRET_ID_ENV, &config.handler.secret_id)
        .variables("RUST_LOG", &config.lambda.log_level)
        .build()
}

fn architecture(config: &AppConfig) -> Architecture {
    match config.lambda.architecture {
        oncall_agent_config::Architecture::Arm64 => Architecture::Arm64,
        oncall_agent_config::Architecture::X86_64 => Architecture::X8664,
    }
}

/// Create the function, or push new code and configuration when it already
/// exists. Returns the function ARN.
pub async fn ensure_function(
    lambda: &Client,
    names: &ResourceNames,
    config: &AppConfig,
    role_arn: &str,
    package: &PackageSource,
) -> Result<String> {
    let function = &names.lambda_function;
    let created = lambda
        .create_function()
        .function_name(function)
        .runtime(Runtime::Providedal2023)
        .handler(HANDLER)
        .role(role_arn)
        .code(package.function_code()?)
        .architectures(architecture(config))
        .timeout(config.lambda.timeout_secs)
        .memory_size(config.lambda.memory_mb)
        .environment(environment(config))
        .send()
        .await;

    match created {
        Ok(output) => {
            println!("  Lambda function {} created", function);
            output
                .function_arn()
                .map(str::to_string)
                .with_context(|| format!("CreateFunction returned no ARN for {}", function))
        }
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_conflict_exception()) =>
        {
            println!("  Lambda function {} already exists, updating", function);
            update_code(lambda, function, config, package).await?;
            wait_for_update(lambda, function, config).await?;
            update_configuration(lambda, function, config, role_arn).await?;
            function_arn(lambda, function).await
        }
        Err(err) => Err(err).with_context(|| format!("Failed to create function {}", function)),
    }
}

async fn update_code(
    lambda: &Client,
    function: &str,
    config: &AppConfig,
    package: &PackageSource,
) -> Result<()> {
    let request = lambda
        .update_function_code()
        .function_name(function)
        .architectures(architecture(config));

    let request = match package {
        PackageSource::Local(path) => request.zip_file(Blob::new(read_zip(path)?)),
        PackageSource::S3 { bucket, key } => request.s3_bucket(bucket).s3_key(key),
    };

    request
        .send()
        .await
        .with_context(|| format!("Failed to update code of {}", function))?;
    Ok(())
}

/// Whether a function is free to take its next update
fn update_settled(status: Option<&LastUpdateStatus>, reason: Option<&str>) -> Result<bool> {
    match status {
        Some(LastUpdateStatus::InProgress) => Ok(false),
        Some(LastUpdateStatus::Failed) => {
            bail!("last update failed: {}", reason.unwrap_or("no reason given"))
        }
        _ => Ok(true),
    }
}

/// Lambda rejects a configuration change while a code update is in flight
async fn wait_for_update(lambda: &Client, function: &str, config: &AppConfig) -> Result<()> {
    let timeout = config.provisioning.agent_ready_timeout();
    let deadline = Instant::now()
        .checked_add(timeout)
        .with_context(|| format!("Update wait of {}s is too large", timeout.as_secs()))?;

    loop {
        let current = lambda
            .get_function_configuration()
            .function_name(function)
            .send()
            .await
            .with_context(|| format!("Failed to read configuration of {}", function))?;
        debug!(
            function = %function,
            status = ?current.last_update_status(),
            "Function update status"
        );
        let settled = update_settled(
            current.last_update_status(),
            current.last_update_status_reason(),
        )
        .with_context(|| format!("Function {} cannot be updated", function))?;
        if settled {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!("Function {} still updating after {}s", function, timeout.as_secs());
        }
        sleep(config.provisioning.agent_poll()).await;
    }
}

/// Re-apply role, environment and sizing so a redeploy matches the config
async fn update_configuration(
    lambda: &Client,
    function: &str,
    config: &AppConfig,
    role_arn: &str,
) -> Result<()> {
    lambda
        .update_function_configuration()
        .function_name(function)
        .runtime(Runtime::Providedal2023)
        .handler(HANDLER)
        .role(role_arn)
        .timeout(config.lambda.timeout_secs)
        .memory_size(config.lambda.memory_mb)
        .environment(environment(config))
        .send()
        .await
        .with_context(|| format!("Failed to update configuration of {}", function))?;
    println!("  Lambda function {} configuration updated", function);
    Ok(())
}

/// ARN of an existing function, `None` when it does not exist
pub async fn find_function(lambda: &Client, function: &str) -> Result<Option<String>> {
    match lambda.get_function().function_name(function).send().await {
        Ok(output) => Ok(output
            .configuration()
            .and_then(|c| c.function_arn())
            .map(str::to_string)),
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_not_found_exception()) =>
        {
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("Failed to read function {}", function)),
    }
}

async fn function_arn(lambda: &Client, function: &str) -> Result<String> {
    find_function(lambda, function)
        .await?
        .with_context(|| format!("Function {} disappeared after update", function))
}

/// Let the agent invoke the handler
pub async fn allow_agent_invoke(
    lambda: &Client,
    names: &ResourceNames,
    agent_id: &str,
) -> Result<()> {
    let added = lambda
        .add_permission()
        .function_name(&names.lambda_function)
        .statement_id(PERMISSION_STATEMENT_ID)
        .action("lambda:InvokeFunction")
        .principal(BEDROCK_SERVICE_PRINCIPAL)
        .source_arn(names.agent_arn(agent_id))
        .send()
        .await;

    match added {
        Ok(_) => {
            println!("  Granted {} invoke permission", BEDROCK_SERVICE_PRINCIPAL);
            Ok(())
        }
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_resource_conflict_exception()) =>
        {
            println!("  Permission already exists");
            Ok(())
        }
        Err(err) => Err(err).with_context(|| {
            format!("Failed to add invoke permission to {}", names.lambda_function)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architecture_mapping() {
        let mut config = AppConfig::default();
        assert_eq!(architecture(&config), Architecture::Arm64);

        config.lambda.architecture = oncall_agent_config::Architecture::X86_64;
        assert_eq!(architecture(&config), Architecture::X8664);
        assert_eq!(architecture(&config).as_str(), "x86_64");
    }

    #[test]
    fn test_custom_runtime() {
        assert_eq!(Runtime::Providedal2023.as_str(), "provided.al2023");
    }

    #[test]
    fn test_environment_carries_secret_and_log_level() {
        let mut config = AppConfig::default();
        config.handler.secret_id = "de/redshift".to_string();
        config.lambda.log_level = "debug".to_string();

        let variables = environment(&config).variables().cloned().unwrap();
        assert_eq!(variables.get(SECRET_ID_ENV).map(String::as_str), Some("de/redshift"));
        assert_eq!(variables.get("RUST_LOG").map(String::as_str), Some("debug"));
    }

    #[test]
    fn test_update_settled() {
        assert!(!update_settled(Some(&LastUpdateStatus::InProgress), None).unwrap());
        assert!(update_settled(Some(&LastUpdateStatus::Successful), None).unwrap());
        assert!(update_settled(None, None).unwrap());

        let err = update_settled(Some(&LastUpdateStatus::Failed), Some("zip too large"))
            .unwrap_err();
        assert_eq!(err.to_string(), "last update failed: zip too large");
    }
}
