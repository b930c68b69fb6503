// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use thiserror::Error;
use tracing::warn;

/// Largest timeout Lambda accepts
const MAX_LAMBDA_TIMEOUT_SECS: i32 = 900;

/// A statement cannot outlive the invocation waiting on it
const MAX_STATEMENT_TIMEOUT_SECS: u64 = MAX_LAMBDA_TIMEOUT_SECS as u64;
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

const MAX_AGENT_READY_TIMEOUT_SECS: u64 = 3600;
const MAX_PROVISIONING_DELAY_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error(
        "handler.secret_id is required inside Lambda; set the SecretId or ONCALL_AGENT_SECRET_ID environment variable"
    )]
    MissingSecretId,
}

pub fn validate_config(config: &AppConfig, platform: Platform) -> anyhow::Result<()> {
    validate_handler_config(&config.handler, platform)?;
    validate_agent_config(&config.agent)?;
    validate_action_group_config(&config.action_group)?;
    validate_lambda_config(&config.lambda)?;
    validate_provisioning_config(&config.provisioning)?;
    Ok(())
}

fn validate_handler_config(config: &HandlerConfig, platform: Platform) -> Result<(), ConfigError> {
    if platform == Platform::Lambda && config.secret_id.trim().is_empty() {
        return Err(ConfigError::MissingSecretId);
    }

    if config.database.trim().is_empty() {
        return Err(ConfigError::Empty {
            field: "handler.database",
        });
    }

    if !config.stats_off_threshold.is_finite() || config.stats_off_threshold <= 0.0 {
        return Err(ConfigError::OutOfRange {
            field: "handler.stats_off_threshold",
            reason: format!(
                "must be a positive number, got {}",
                config.stats_off_threshold
            ),
        });
    }

    check_range(
        "handler.poll_interval_ms",
        config.poll_interval_ms,
        1,
        MAX_POLL_INTERVAL_MS,
    )?;
    check_range(
        "handler.statement_timeout_secs",
        config.statement_timeout_secs,
        1,
        MAX_STATEMENT_TIMEOUT_SECS,
    )?;

    // svv_table_info.stats_off is a percentage
    if config.stats_off_threshold >= 100.0 {
        warn!(
            threshold = config.stats_off_threshold,
            "handler.stats_off_threshold >= 100; ANALYZE will never run"
        );
    }

    Ok(())
}

fn validate_agent_config(config: &AgentConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Empty { field: "agent.name" });
    }

    if config.inference_profile.trim().is_empty() {
        return Err(ConfigError::Empty {
            field: "agent.inference_profile",
        });
    }

    if config.instruction.len() < 40 {
        // Bedrock rejects shorter instructions at CreateAgent time
        return Err(ConfigError::OutOfRange {
            field: "agent.instruction",
            reason: "must be at least 40 characters".to_string(),
        });
    }

    if config.idle_session_ttl_secs < 60 || config.idle_session_ttl_secs > 3600 {
        return Err(ConfigError::OutOfRange {
            field: "agent.idle_session_ttl_secs",
            reason: format!("must be 60-3600, got {}", config.idle_session_ttl_secs),
        });
    }

    Ok(())
}

fn validate_action_group_config(config: &ActionGroupConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Empty {
            field: "action_group.name",
        });
    }
    Ok(())
}

fn validate_lambda_config(config: &LambdaConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > MAX_LAMBDA_TIMEOUT_SECS {
        return Err(ConfigError::OutOfRange {
            field: "lambda.timeout_secs",
            reason: format!(
                "must be 1-{}, got {}",
                MAX_LAMBDA_TIMEOUT_SECS, config.timeout_secs
            ),
        });
    }

    if config.memory_mb < 128 || config.memory_mb > 10_240 {
        return Err(ConfigError::OutOfRange {
            field: "lambda.memory_mb",
            reason: format!("must be 128-10240, got {}", config.memory_mb),
        });
    }

    if let Some(package) = &config.package {
        if package.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "lambda.package",
            });
        }
    }

    Ok(())
}

fn validate_provisioning_config(config: &ProvisioningConfig) -> Result<(), ConfigError> {
    check_range(
        "provisioning.iam_propagation_secs",
        config.iam_propagation_secs,
        0,
        MAX_PROVISIONING_DELAY_SECS,
    )?;
    check_range(
        "provisioning.role_wait_attempts",
        u64::from(config.role_wait_attempts),
        1,
        100,
    )?;
    check_range(
        "provisioning.role_wait_delay_secs",
        config.role_wait_delay_secs,
        1,
        MAX_PROVISIONING_DELAY_SECS,
    )?;
    check_range(
        "provisioning.agent_ready_timeout_secs",
        config.agent_ready_timeout_secs,
        1,
        MAX_AGENT_READY_TIMEOUT_SECS,
    )?;
    check_range(
        "provisioning.agent_poll_secs",
        config.agent_poll_secs,
        1,
        MAX_PROVISIONING_DELAY_SECS,
    )?;
    Ok(())
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            reason: format!("must be {}-{}, got {}", min, max, value),
        });
    }
    Ok(())
}
