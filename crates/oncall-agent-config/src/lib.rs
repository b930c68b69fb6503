// oncall-agent-config - Unified configuration for the handler and the CLI
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority, ONCALL_AGENT_* plus SecretId)
// 2. Config file path from --config or ONCALL_AGENT_CONFIG
// 3. Config file contents from ONCALL_AGENT_CONFIG_CONTENT
// 4. Default config file locations (./oncall-agent.toml, ./.oncall-agent.toml)
// 5. Platform-specific defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod env_overrides;
mod names;
mod platform;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX, SECRET_ID_ENV};
pub use names::{foundation_model, ResourceNames};
pub use platform::Platform;
pub use validation::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub handler: HandlerConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub action_group: ActionGroupConfig,

    #[serde(default)]
    pub lambda: LambdaConfig,

    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Sections present in a TOML file; absent sections keep the current values
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    logging: Option<LoggingConfig>,
    handler: Option<HandlerConfig>,
    agent: Option<AgentConfig>,
    action_group: Option<ActionGroupConfig>,
    lambda: Option<LambdaConfig>,
    provisioning: Option<ProvisioningConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Action-group handler configuration (read inside the Lambda)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlerConfig {
    /// Secrets Manager id or ARN holding the warehouse connection secret
    pub secret_id: String,
    /// Database used when the secret does not name one
    pub database: String,
    pub stats_off_threshold: f64,
    pub poll_interval_ms: u64,
    pub statement_timeout_secs: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            secret_id: String::new(),
            database: "dev".to_string(),
            stats_off_threshold: 10.0,
            poll_interval_ms: 250,
            statement_timeout_secs: 60,
        }
    }
}

impl HandlerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }
}

/// Bedrock agent definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    pub instruction: String,
    /// Inference profile id used as the agent's foundation model
    pub inference_profile: String,
    pub idle_session_ttl_secs: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrock_policy_name: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "de_oncall_agent_function_def".to_string(),
            description: "Agent for providing Date Engineer on call to help troubleshoot"
                .to_string(),
            instruction: "You are an DE agent, helping DE have peace during oncall".to_string(),
            inference_profile: "amazon.nova-lite-v1:0".to_string(),
            idle_session_ttl_secs: 1800,
            alias_name: None,
            role_name: None,
            bedrock_policy_name: None,
        }
    }
}

/// Action group wiring the agent to the Lambda
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActionGroupConfig {
    pub name: String,
    pub description: String,
}

impl Default for ActionGroupConfig {
    fn default() -> Self {
        Self {
            name: "DEActionGroup".to_string(),
            description: "Actions for optimisation of performance".to_string(),
        }
    }
}

/// Lambda function deployment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LambdaConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    /// Deployment package: a local zip path or an s3://bucket/key URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub architecture: Architecture,
    pub timeout_secs: i32,
    pub memory_mb: i32,
    /// RUST_LOG value set on the deployed function
    pub log_level: String,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            function_name: None,
            role_name: None,
            package: None,
            architecture: Architecture::Arm64,
            timeout_secs: 180,
            memory_mb: 128,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Arm64 => "arm64",
            Architecture::X86_64 => "x86_64",
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Architecture {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "x86_64" | "x86-64" | "amd64" => Ok(Architecture::X86_64),
            _ => anyhow::bail!("Unsupported architecture: {}. Supported: arm64, x86_64", s),
        }
    }
}

/// Waits used while provisioning resources that become visible eventually
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    /// Pause after creating IAM roles so other services can see them
    pub iam_propagation_secs: u64,
    pub role_wait_attempts: u32,
    pub role_wait_delay_secs: u64,
    /// Bound on agent status transitions and on a function's pending update
    pub agent_ready_timeout_secs: u64,
    pub agent_poll_secs: u64,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            iam_propagation_secs: 10,
            role_wait_attempts: 10,
            role_wait_delay_secs: 5,
            agent_ready_timeout_secs: 120,
            agent_poll_secs: 5,
        }
    }
}

impl ProvisioningConfig {
    pub fn iam_propagation(&self) -> Duration {
        Duration::from_secs(self.iam_propagation_secs)
    }

    pub fn role_wait_delay(&self) -> Duration {
        Duration::from_secs(self.role_wait_delay_secs)
    }

    pub fn agent_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_ready_timeout_secs)
    }

    pub fn agent_poll(&self) -> Duration {
        Duration::from_secs(self.agent_poll_secs)
    }
}

impl AppConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        let platform = Platform::detect();
        sources::load_config(platform)
    }

    /// Load configuration for a specific platform
    pub fn load_for_platform(platform: Platform) -> Result<Self> {
        sources::load_config(platform)
    }

    /// Load configuration from an explicit file (CLI --config flag)
    pub fn load_from_path(path: impl AsRef<Path>, platform: Platform) -> Result<Self> {
        sources::load_from_file_path(path, platform)
    }

    pub fn from_platform_defaults(platform: Platform) -> Self {
        let defaults = platform.defaults();
        Self {
            logging: LoggingConfig {
                level: defaults.log_level.to_string(),
                format: defaults.log_format,
            },
            ..Default::default()
        }
    }

    /// Merge a parsed file into this config (used for TOML layering).
    pub(crate) fn merge(&mut self, other: FileConfig) {
        if let Some(logging) = other.logging {
            self.logging = logging;
        }
        if let Some(handler) = other.handler {
            self.handler = handler;
        }
        if let Some(agent) = other.agent {
            self.agent = agent;
        }
        if let Some(action_group) = other.action_group {
            self.action_group = action_group;
        }
        if let Some(lambda) = other.lambda {
            self.lambda = lambda;
        }
        if let Some(provisioning) = other.provisioning {
            self.provisioning = provisioning;
        }
    }

    /// Validate the configuration for the platform it will run on
    pub fn validate(&self, platform: Platform) -> Result<()> {
        validation::validate_config(self, platform)
    }

    /// Render the resolved configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}
