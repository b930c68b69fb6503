//! `deploy`: provision every resource the agent needs, in dependency order.
//!
//! Each step tolerates the resource already existing, so a failed run can be
//! repeated.

mod agent;
mod function;
mod iam;
mod package;

pub use agent::{prepare_agent, resolve_alias};
pub use function::find_function;
pub use package::PackageSource;

use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::Confirm;
use oncall_agent_config::AppConfig;
use std::io::IsTerminal;

use crate::aws::AwsContext;

#[derive(Args, Debug, Default)]
pub struct DeployArgs {
    /// Handler package: a local zip or s3://bucket/key (overrides lambda.package)
    #[arg(long, value_name = "ZIP_OR_S3_URI")]
    pub package: Option<String>,

    /// Secrets Manager secret holding the warehouse credentials (overrides handler.secret_id)
    #[arg(long, value_name = "SECRET_ID")]
    pub secret_id: Option<String>,

    /// Create the configured alias when the agent has none by that name
    #[arg(long)]
    pub create_alias: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn run(args: DeployArgs, mut config: AppConfig, region: Option<&str>) -> Result<()> {
    if let Some(secret_id) = args.secret_id {
        config.handler.secret_id = secret_id;
    }
    if config.handler.secret_id.trim().is_empty() {
        bail!("No warehouse secret configured. Pass --secret-id or set handler.secret_id");
    }

    let package = args
        .package
        .or_else(|| config.lambda.package.clone())
        .context("No handler package configured. Pass --package or set lambda.package")?;
    let package = PackageSource::parse(&package)?;

    let ctx = AwsContext::load(region).await?;
    let names = ctx.names(&config);

    println!();
    println!("oncall-agent deploy - Bedrock agent + Lambda action group");
    println!();
    println!("  Account:         {}", names.account_id);
    println!("  Region:          {}", names.region);
    println!("  Agent:           {}", names.agent);
    println!("  Model:           {}", config.agent.inference_profile);
    println!("  Lambda function: {}", names.lambda_function);
    println!(
        "  Lambda config:   {}, {}s timeout, {} MB (applied on create and update)",
        config.lambda.architecture, config.lambda.timeout_secs, config.lambda.memory_mb
    );
    println!("  Package:         {}", package);
    println!("  Secret:          {}", config.handler.secret_id);
    println!();

    if !args.yes {
        if !std::io::stdin().is_terminal() {
            bail!("Refusing to deploy without confirmation; pass --yes in non-interactive shells");
        }
        let proceed = Confirm::new()
            .with_prompt("Create or update these resources?")
            .default(false)
            .interact()?;
        if !proceed {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("[1/9] Lambda execution role");
    let lambda_role_arn = iam::ensure_lambda_role(&ctx.iam, &names, &config.provisioning).await?;

    println!("[2/9] Lambda function");
    let function_arn =
        function::ensure_function(&ctx.lambda, &names, &config, &lambda_role_arn, &package)
            .await?;

    println!("[3/9] Bedrock model policy");
    let policy_arn = iam::ensure_bedrock_policy(&ctx.iam, &names, &config.agent).await?;

    println!("[4/9] Agent role");
    let agent_role_arn =
        iam::ensure_agent_role(&ctx.iam, &names, &policy_arn, &config.provisioning).await?;

    println!("[5/9] Agent");
    let agent_id = agent::ensure_agent(&ctx.agents, &names, &config, &agent_role_arn).await?;

    println!("[6/9] Action group");
    agent::ensure_action_group(&ctx.agents, &agent_id, &config, &function_arn).await?;

    println!("[7/9] Lambda invoke permission");
    function::allow_agent_invoke(&ctx.lambda, &names, &agent_id).await?;

    println!("[8/9] Prepare agent");
    prepare_agent(&ctx.agents, &agent_id, &config).await?;

    println!("[9/9] Agent alias");
    let alias = resolve_alias(&ctx.agents, &agent_id, &names, args.create_alias).await?;

    println!();
    println!("Deployment completed successfully!");
    println!("  Agent ID:       {}", agent_id);
    match alias {
        Some(alias) => println!("  Agent Alias ID: {}", alias.id),
        None => println!("  Agent Alias ID: none (rerun with --create-alias)"),
    }
    println!();
    println!("Next steps:");
    println!("  oncall-agent invoke \"Check table metadata for splittest table\"");
    println!();

    Ok(())
}
