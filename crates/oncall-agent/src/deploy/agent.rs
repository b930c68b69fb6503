//! Agent, action group, preparation and alias

use anyhow::{Context, Result};
use aws_sdk_bedrockagent::types::{ActionGroupExecutor, AgentStatus};
use aws_sdk_bedrockagent::Client;
use oncall_agent_config::{AppConfig, ResourceNames};
use oncall_agent_core::schema::action_group_functions;
use tracing::warn;

use crate::agents::{
    find_agent, function_schema, list_aliases, pick_alias, wait_for_agent, AliasLookup, AliasRef,
    DRAFT_VERSION,
};

/// Create the agent, falling back to an existing agent of the same name.
/// Returns the agent id once it has left `CREATING`.
pub async fn ensure_agent(
    agents: &Client,
    names: &ResourceNames,
    config: &AppConfig,
    role_arn: &str,
) -> Result<String> {
    let created = agents
        .create_agent()
        .agent_name(&names.agent)
        .agent_resource_role_arn(role_arn)
        .description(&config.agent.description)
        .idle_session_ttl_in_seconds(config.agent.idle_session_ttl_secs)
        .foundation_model(&config.agent.inference_profile)
        .instruction(&config.agent.instruction)
        .send()
        .await;

    let agent_id = match created {
        Ok(output) => {
            let id = output
                .agent()
                .map(|agent| agent.agent_id().to_string())
                .context("CreateAgent returned no agent")?;
            println!("  Agent {} created with ID {}", names.agent, id);
            id
        }
        Err(create_err) => {
            println!(
                "  Could not create agent, looking for an existing agent named {}",
                names.agent
            );
            match find_agent(agents, &names.agent).await? {
                Some(existing) => {
                    println!("  Found existing agent with ID {}", existing.id);
                    existing.id
                }
                None => {
                    return Err(create_err)
                        .with_context(|| format!("Failed to create agent {}", names.agent))
                }
            }
        }
    };

    let provisioning = &config.provisioning;
    wait_for_agent(
        agents,
        &agent_id,
        &[AgentStatus::Creating],
        provisioning.agent_ready_timeout(),
        provisioning.agent_poll(),
    )
    .await?;

    Ok(agent_id)
}

/// Register the action group on the draft version. An existing group with
/// the same name is left untouched; `update-action-group` refreshes it.
pub async fn ensure_action_group(
    agents: &Client,
    agent_id: &str,
    config: &AppConfig,
    function_arn: &str,
) -> Result<()> {
    let created = agents
        .create_agent_action_group()
        .agent_id(agent_id)
        .agent_version(DRAFT_VERSION)
        .action_group_name(&config.action_group.name)
        .description(&config.action_group.description)
        .action_group_executor(ActionGroupExecutor::Lambda(function_arn.to_string()))
        .function_schema(function_schema(&action_group_functions())?)
        .send()
        .await;

    match created {
        Ok(output) => {
            match output.agent_action_group() {
                Some(group) => {
                    println!("  Action group created with ID {}", group.action_group_id())
                }
                None => println!("  Action group created"),
            }
            Ok(())
        }
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_conflict_exception()) =>
        {
            warn!(
                action_group = %config.action_group.name,
                "Action group already exists: {}",
                aws_sdk_bedrockagent::error::DisplayErrorContext(&err)
            );
            println!(
                "  Action group {} already exists, leaving it as is",
                config.action_group.name
            );
            Ok(())
        }
        Err(err) => Err(err).with_context(|| {
            format!("Failed to create action group {}", config.action_group.name)
        }),
    }
}

/// Build the draft version so it can be invoked, then wait for it to finish
pub async fn prepare_agent(
    agents: &Client,
    agent_id: &str,
    config: &AppConfig,
) -> Result<AgentStatus> {
    let output = agents
        .prepare_agent()
        .agent_id(agent_id)
        .send()
        .await
        .with_context(|| format!("Failed to prepare agent {}", agent_id))?;
    println!("  Agent {} is {}", agent_id, output.agent_status().as_str());

    wait_for_agent(
        agents,
        agent_id,
        &[AgentStatus::Preparing],
        config.provisioning.agent_ready_timeout(),
        config.provisioning.agent_poll(),
    )
    .await
}

/// Alias to invoke: the configured one, created on request, or the first
/// listed (every agent carries a test alias)
pub async fn resolve_alias(
    agents: &Client,
    agent_id: &str,
    names: &ResourceNames,
    create: bool,
) -> Result<Option<AliasRef>> {
    let aliases = list_aliases(agents, agent_id).await?;

    match pick_alias(aliases, &names.agent_alias) {
        AliasLookup::Named(alias) => Ok(Some(alias)),
        _ if create => {
            let output = agents
                .create_agent_alias()
                .agent_id(agent_id)
                .agent_alias_name(&names.agent_alias)
                .send()
                .await
                .with_context(|| format!("Failed to create alias {}", names.agent_alias))?;
            let alias = output
                .agent_alias()
                .map(|alias| AliasRef {
                    id: alias.agent_alias_id().to_string(),
                    name: alias.agent_alias_name().to_string(),
                })
                .context("CreateAgentAlias returned no alias")?;
            println!("  Alias {} created with ID {}", alias.name, alias.id);
            Ok(Some(alias))
        }
        AliasLookup::FirstListed(alias) => {
            println!(
                "  Alias {} not found, using {} ({})",
                names.agent_alias, alias.name, alias.id
            );
            Ok(Some(alias))
        }
        AliasLookup::Missing => Ok(None),
    }
}
