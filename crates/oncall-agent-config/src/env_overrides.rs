use super::{AppConfig, Architecture, LogFormat};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "ONCALL_AGENT_";

/// Unprefixed variable the deploy step sets on the Lambda function
pub const SECRET_ID_ENV: &str = "SecretId";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the ONCALL_AGENT_ prefix
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut AppConfig, env: &E) -> Result<()> {
    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.logging.level = level;
    } else if let Some(level) = get_raw_env_string(env, "RUST_LOG") {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.logging.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    // Handler. The prefixed name wins over the raw SecretId set at deploy time.
    if let Some(secret_id) = get_env_string(env, "SECRET_ID") {
        config.handler.secret_id = secret_id;
    } else if let Some(secret_id) = get_raw_env_string(env, SECRET_ID_ENV) {
        config.handler.secret_id = secret_id;
    }
    if let Some(database) = get_env_string(env, "DATABASE") {
        config.handler.database = database;
    }
    if let Some(threshold) = get_env_f64(env, "STATS_OFF_THRESHOLD")? {
        config.handler.stats_off_threshold = threshold;
    }
    if let Some(val) = get_env_u64(env, "POLL_INTERVAL_MS")? {
        config.handler.poll_interval_ms = val;
    }
    if let Some(val) = get_env_u64(env, "STATEMENT_TIMEOUT_SECS")? {
        config.handler.statement_timeout_secs = val;
    }

    // Agent
    if let Some(name) = get_env_string(env, "AGENT_NAME") {
        config.agent.name = name;
    }
    if let Some(profile) = get_env_string(env, "INFERENCE_PROFILE") {
        config.agent.inference_profile = profile;
    }
    if let Some(alias) = get_env_string(env, "AGENT_ALIAS_NAME") {
        config.agent.alias_name = Some(alias);
    }
    if let Some(name) = get_env_string(env, "ACTION_GROUP_NAME") {
        config.action_group.name = name;
    }

    // Lambda
    if let Some(name) = get_env_string(env, "LAMBDA_FUNCTION_NAME") {
        config.lambda.function_name = Some(name);
    }
    if let Some(package) = get_env_string(env, "LAMBDA_PACKAGE") {
        config.lambda.package = Some(package);
    }
    if let Some(arch) = get_env_string(env, "LAMBDA_ARCHITECTURE") {
        config.lambda.architecture = arch
            .parse::<Architecture>()
            .context("Invalid ONCALL_AGENT_LAMBDA_ARCHITECTURE value")?;
    }
    if let Some(val) = get_env_i32(env, "LAMBDA_TIMEOUT_SECS")? {
        config.lambda.timeout_secs = val;
    }

    // Provisioning
    if let Some(val) = get_env_u64(env, "IAM_PROPAGATION_SECS")? {
        config.provisioning.iam_propagation_secs = val;
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key).filter(|val| !val.is_empty())
}

fn get_raw_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get_raw(key).filter(|val| !val.is_empty())
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_i32<E: EnvSource>(env: &E, key: &str) -> Result<Option<i32>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<i32>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_f64<E: EnvSource>(env: &E, key: &str) -> Result<Option<f64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<f64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);

    impl EnvSource for MapEnv {
        fn get(&self, key: &str) -> Option<String> {
            self.0
                .get(format!("{}{}", ENV_PREFIX, key).as_str())
                .map(|v| v.to_string())
        }

        fn get_raw(&self, key: &str) -> Option<String> {
            self.0.get(key).map(|v| v.to_string())
        }
    }

    fn env(pairs: &[(&'static str, &'static str)]) -> MapEnv {
        MapEnv(pairs.iter().copied().collect())
    }

    #[test]
    fn test_raw_secret_id_is_used() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, &env(&[("SecretId", "de/redshift")])).unwrap();
        assert_eq!(config.handler.secret_id, "de/redshift");
    }

    #[test]
    fn test_prefixed_secret_id_wins() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            &env(&[
                ("SecretId", "from-deploy"),
                ("ONCALL_AGENT_SECRET_ID", "from-operator"),
            ]),
        )
        .unwrap();
        assert_eq!(config.handler.secret_id, "from-operator");
    }

    #[test]
    fn test_numeric_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            &env(&[
                ("ONCALL_AGENT_STATS_OFF_THRESHOLD", "25.5"),
                ("ONCALL_AGENT_LAMBDA_TIMEOUT_SECS", "60"),
                ("ONCALL_AGENT_LAMBDA_ARCHITECTURE", "x86_64"),
            ]),
        )
        .unwrap();
        assert_eq!(config.handler.stats_off_threshold, 25.5);
        assert_eq!(config.lambda.timeout_secs, 60);
        assert_eq!(config.lambda.architecture, Architecture::X86_64);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(
            &mut config,
            &env(&[("ONCALL_AGENT_POLL_INTERVAL_MS", "soon")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("ONCALL_AGENT_POLL_INTERVAL_MS"));
    }

    #[test]
    fn test_rust_log_fallback() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, &env(&[("RUST_LOG", "debug")])).unwrap();
        assert_eq!(config.logging.level, "debug");

        apply_env_overrides(
            &mut config,
            &env(&[("RUST_LOG", "debug"), ("ONCALL_AGENT_LOG_LEVEL", "warn")]),
        )
        .unwrap();
        assert_eq!(config.logging.level, "warn");
    }
}
