// oncall-agent - provisioning and smoke-testing CLI for the on-call agent
//
// Deploys the action-group Lambda, the IAM roles and policy it needs, and the
// Bedrock agent that calls it; then lets you talk to the agent.

pub mod agents;
pub mod aws;
pub mod deploy;
pub mod invoke;
pub mod policy;
pub mod status;
pub mod update;

use oncall_agent_config::{LogFormat, LoggingConfig};

/// Initialize tracing for the CLI. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let _ = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        ),
    };
}
