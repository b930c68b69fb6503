//! `update-action-group`: push the current function schema to an existing agent

use anyhow::{Context, Result};
use oncall_agent_config::AppConfig;
use oncall_agent_core::schema::action_group_functions;

use crate::agents::{find_action_group, find_agent, function_schema, DRAFT_VERSION};
use crate::aws::AwsContext;
use crate::deploy::prepare_agent;

pub async fn run(config: AppConfig, region: Option<&str>) -> Result<()> {
    let ctx = AwsContext::load(region).await?;
    let names = ctx.names(&config);

    let Some(agent) = find_agent(&ctx.agents, &names.agent).await? else {
        println!("Agent {} not found. Run `oncall-agent deploy` first.", names.agent);
        return Ok(());
    };
    println!("Found agent {} ({})", agent.name, agent.id);

    let Some(action_group_id) =
        find_action_group(&ctx.agents, &agent.id, &names.action_group).await?
    else {
        println!(
            "Action group {} not found on agent {}",
            names.action_group, agent.id
        );
        return Ok(());
    };

    // Carry the executor over; an update without one detaches the Lambda
    let current = ctx
        .agents
        .get_agent_action_group()
        .agent_id(&agent.id)
        .agent_version(DRAFT_VERSION)
        .action_group_id(&action_group_id)
        .send()
        .await
        .with_context(|| format!("Failed to read action group {}", action_group_id))?;
    let executor = current
        .agent_action_group()
        .and_then(|group| group.action_group_executor())
        .cloned();

    ctx.agents
        .update_agent_action_group()
        .agent_id(&agent.id)
        .agent_version(DRAFT_VERSION)
        .action_group_id(&action_group_id)
        .action_group_name(&names.action_group)
        .description(&config.action_group.description)
        .set_action_group_executor(executor)
        .function_schema(function_schema(&action_group_functions())?)
        .send()
        .await
        .with_context(|| format!("Failed to update action group {}", names.action_group))?;
    println!("Updated action group {} ({})", names.action_group, action_group_id);

    let status = prepare_agent(&ctx.agents, &agent.id, &config).await?;
    println!("Agent {} is {}", agent.id, status.as_str());

    Ok(())
}
