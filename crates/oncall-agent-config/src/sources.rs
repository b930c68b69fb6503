// Configuration source loading.
//
// Priority order:
// 1. Environment variables (ONCALL_AGENT_* prefix, plus SecretId)
// 2. Config file path from ONCALL_AGENT_CONFIG
// 3. Inline config content from ONCALL_AGENT_CONFIG_CONTENT
// 4. Default config files (./oncall-agent.toml, ./.oncall-agent.toml)
// 5. Platform defaults (based on auto-detected Platform)

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::platform::Platform;
use crate::{AppConfig, FileConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use tracing::debug;

const DEFAULT_PATHS: &[&str] = &["./oncall-agent.toml", "./.oncall-agent.toml"];

/// Load configuration for the platform using native environment/file access.
pub fn load_config(platform: Platform) -> Result<AppConfig> {
    let mut config = AppConfig::from_platform_defaults(platform);

    if let Some(file_config) = load_from_file()? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate(platform)?;
    Ok(config)
}

fn load_from_file() -> Result<Option<FileConfig>> {
    if let Ok(path) = env::var("ONCALL_AGENT_CONFIG") {
        return read_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("ONCALL_AGENT_CONFIG_CONTENT") {
        let config: FileConfig = toml::from_str(&content)
            .context("Failed to parse inline config from ONCALL_AGENT_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_PATHS {
        let path = Path::new(path);
        if path.exists() {
            debug!(path = %path.display(), "Using default config file");
            return read_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>, platform: Platform) -> Result<AppConfig> {
    let file_config = read_file(path.as_ref())?;

    let mut config = AppConfig::from_platform_defaults(platform);
    config.merge(file_config);

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate(platform)?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;
    use std::io::Write;

    #[test]
    fn platform_defaults_match_expectations() {
        let cli = AppConfig::from_platform_defaults(Platform::Cli);
        assert_eq!(cli.logging.format, LogFormat::Text);

        let lambda = AppConfig::from_platform_defaults(Platform::Lambda);
        assert_eq!(lambda.logging.format, LogFormat::Json);
    }

    #[test]
    fn explicit_file_is_merged_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[agent]
name = "nightly_oncall"
inference_profile = "us.amazon.nova-pro-v1:0"

[lambda]
package = "target/lambda/oncall-agent-lambda/bootstrap.zip"
"#
        )
        .unwrap();

        let config = load_from_file_path(file.path(), Platform::Cli).unwrap();
        assert_eq!(config.agent.name, "nightly_oncall");
        assert_eq!(config.agent.idle_session_ttl_secs, 1800);
        assert_eq!(
            config.lambda.package.as_deref(),
            Some("target/lambda/oncall-agent-lambda/bootstrap.zip")
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_from_file_path("/nonexistent/oncall-agent.toml", Platform::Cli).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
