use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use oncall_agent::deploy::DeployArgs;
use oncall_agent::invoke::InvokeArgs;
use oncall_agent_config::{AppConfig, Platform};
use std::path::PathBuf;

/// Bedrock on-call agent that keeps Redshift table statistics fresh
#[derive(Parser, Debug)]
#[command(name = "oncall-agent")]
#[command(version)]
#[command(about = "Deploy and talk to the data-engineering on-call agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// AWS region (defaults to the profile/environment region)
    #[arg(short, long, value_name = "REGION", global = true)]
    region: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or update the Lambda, IAM resources, agent and action group
    Deploy(DeployArgs),
    /// Push the current function schema to the existing action group
    UpdateActionGroup,
    /// Send a question to the deployed agent
    Invoke(InvokeArgs),
    /// Show which resources exist
    Status,
    /// Print the resolved configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path, Platform::Cli)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load_for_platform(Platform::Cli)
            .context("Failed to load configuration")?,
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    oncall_agent::init_tracing(&config.logging);

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(run(cli.command, config, cli.region))
}

async fn run(command: Commands, config: AppConfig, region: Option<String>) -> Result<()> {
    let region = region.as_deref();
    match command {
        Commands::Deploy(args) => oncall_agent::deploy::run(args, config, region).await,
        Commands::UpdateActionGroup => oncall_agent::update::run(config, region).await,
        Commands::Invoke(args) => oncall_agent::invoke::run(args, config, region).await,
        Commands::Status => oncall_agent::status::run(config, region).await,
        Commands::Config => Ok(()),
    }
}
