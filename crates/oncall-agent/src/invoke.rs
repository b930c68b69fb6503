//! `invoke`: ask the deployed agent a question and print its answer

use anyhow::{Context, Result};
use aws_sdk_bedrockagentruntime::types::ResponseStream;
use clap::Args;
use oncall_agent_config::AppConfig;
use tracing::{debug, info};

use crate::agents::find_agent;
use crate::aws::AwsContext;
use crate::deploy::resolve_alias;

pub const DEFAULT_QUERY: &str = "Check table metadata for splittest table";

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Question for the agent
    #[arg(default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Alias to invoke instead of the configured one
    #[arg(long, value_name = "ALIAS_ID")]
    pub alias_id: Option<String>,

    /// Continue an existing session instead of starting a new one
    #[arg(long, value_name = "SESSION_ID")]
    pub session_id: Option<String>,
}

pub async fn run(args: InvokeArgs, config: AppConfig, region: Option<&str>) -> Result<()> {
    let ctx = AwsContext::load(region).await?;
    let names = ctx.names(&config);

    let agent = find_agent(&ctx.agents, &names.agent).await?.with_context(|| {
        format!("Agent {} not found. Run `oncall-agent deploy` first", names.agent)
    })?;

    let alias_id = match args.alias_id {
        Some(id) => id,
        None => resolve_alias(&ctx.agents, &agent.id, &names, false)
            .await?
            .map(|alias| alias.id)
            .with_context(|| format!("Agent {} has no aliases", agent.id))?,
    };

    let session_id = args
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    info!(
        agent_id = %agent.id,
        alias_id = %alias_id,
        session_id = %session_id,
        "Invoking agent"
    );

    let mut output = ctx
        .runtime
        .invoke_agent()
        .agent_id(&agent.id)
        .agent_alias_id(&alias_id)
        .session_id(&session_id)
        .input_text(&args.query)
        .enable_trace(true)
        .end_session(false)
        .send()
        .await
        .with_context(|| format!("Failed to invoke agent {}", agent.id))?;

    let mut answer = String::new();
    while let Some(event) = output
        .completion
        .recv()
        .await
        .context("Failed to read the agent response stream")?
    {
        match event {
            ResponseStream::Chunk(part) => {
                if let Some(bytes) = part.bytes() {
                    answer.push_str(&String::from_utf8_lossy(bytes.as_ref()));
                }
            }
            ResponseStream::Trace(part) => debug!(trace = ?part.trace(), "Agent trace"),
            other => debug!(event = ?other, "Ignoring agent stream event"),
        }
    }

    println!("{}", answer);
    println!();
    println!("Session: {}", session_id);
    Ok(())
}
