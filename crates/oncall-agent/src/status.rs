//! `status`: report which of the derived resources exist

use anyhow::{Context, Result};
use oncall_agent_config::{AppConfig, ResourceNames};

use crate::agents::{find_action_group, find_agent, list_aliases};
use crate::aws::AwsContext;
use crate::deploy::find_function;

pub async fn run(config: AppConfig, region: Option<&str>) -> Result<()> {
    let ctx = AwsContext::load(region).await?;
    let names = ctx.names(&config);

    println!();
    println!("oncall-agent status ({} / {})", names.account_id, names.region);
    println!();

    let lambda_role = role_exists(&ctx.iam, &names.lambda_role).await?;
    line("Lambda role", &names.lambda_role, presence(lambda_role));

    let function = find_function(&ctx.lambda, &names.lambda_function).await?;
    line(
        "Lambda function",
        &names.lambda_function,
        function.as_deref().unwrap_or("missing").to_string(),
    );

    let policy = policy_exists(&ctx.iam, &names).await?;
    line("Bedrock policy", &names.bedrock_policy, presence(policy));

    let agent_role = role_exists(&ctx.iam, &names.agent_role).await?;
    line("Agent role", &names.agent_role, presence(agent_role));

    let Some(agent) = find_agent(&ctx.agents, &names.agent).await? else {
        line("Agent", &names.agent, "missing".to_string());
        println!();
        return Ok(());
    };
    line(
        "Agent",
        &names.agent,
        format!("{} ({})", agent.id, agent.status.as_str()),
    );

    let group = find_action_group(&ctx.agents, &agent.id, &names.action_group).await?;
    line(
        "Action group",
        &names.action_group,
        group.unwrap_or_else(|| "missing".to_string()),
    );

    let aliases = list_aliases(&ctx.agents, &agent.id).await?;
    if aliases.is_empty() {
        line("Aliases", &names.agent_alias, "none".to_string());
    }
    for alias in aliases {
        let marker = if alias.name == names.agent_alias {
            " (configured)"
        } else {
            ""
        };
        line("Alias", &alias.name, format!("{}{}", alias.id, marker));
    }
    println!();

    Ok(())
}

fn line(kind: &str, name: &str, state: String) {
    println!("  {:<16} {:<56} {}", kind, name, state);
}

fn presence(exists: bool) -> String {
    if exists { "present" } else { "missing" }.to_string()
}

async fn role_exists(iam: &aws_sdk_iam::Client, role: &str) -> Result<bool> {
    match iam.get_role().role_name(role).send().await {
        Ok(_) => Ok(true),
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_no_such_entity_exception()) =>
        {
            Ok(false)
        }
        Err(err) => Err(err).with_context(|| format!("Failed to read role {}", role)),
    }
}

async fn policy_exists(iam: &aws_sdk_iam::Client, names: &ResourceNames) -> Result<bool> {
    match iam
        .get_policy()
        .policy_arn(names.bedrock_policy_arn())
        .send()
        .await
    {
        Ok(_) => Ok(true),
        Err(err)
            if err
                .as_service_error()
                .is_some_and(|e| e.is_no_such_entity_exception()) =>
        {
            Ok(false)
        }
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read policy {}", names.bedrock_policy))
        }
    }
}
