//! Bedrock agent lookups shared by the subcommands

use anyhow::{bail, Context, Result};
use aws_sdk_bedrockagent::types::{AgentStatus, Function, FunctionSchema, ParameterDetail, Type};
use aws_sdk_bedrockagent::Client;
use oncall_agent_core::{FunctionDefinition, ParameterType};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Working version of an agent; action groups are edited here
pub const DRAFT_VERSION: &str = "DRAFT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRef {
    pub id: String,
    pub name: String,
    pub status: AgentStatus,
}

/// Find an agent by exact name across every ListAgents page
pub async fn find_agent(client: &Client, name: &str) -> Result<Option<AgentRef>> {
    let mut pages = client.list_agents().into_paginator().send();
    while let Some(page) = pages.next().await {
        let page = page.context("Failed to list Bedrock agents")?;
        if let Some(summary) = page
            .agent_summaries()
            .iter()
            .find(|summary| summary.agent_name() == name)
        {
            return Ok(Some(AgentRef {
                id: summary.agent_id().to_string(),
                name: summary.agent_name().to_string(),
                status: summary.agent_status().clone(),
            }));
        }
    }
    Ok(None)
}

/// Action group id on the draft version, looked up by name
pub async fn find_action_group(
    client: &Client,
    agent_id: &str,
    name: &str,
) -> Result<Option<String>> {
    let mut pages = client
        .list_agent_action_groups()
        .agent_id(agent_id)
        .agent_version(DRAFT_VERSION)
        .into_paginator()
        .send();
    while let Some(page) = pages.next().await {
        let page = page.context("Failed to list action groups")?;
        if let Some(group) = page
            .action_group_summaries()
            .iter()
            .find(|group| group.action_group_name() == name)
        {
            return Ok(Some(group.action_group_id().to_string()));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasLookup {
    /// An alias carrying the configured name
    Named(AliasRef),
    /// No alias with that name; the first one listed
    FirstListed(AliasRef),
    Missing,
}

pub async fn list_aliases(client: &Client, agent_id: &str) -> Result<Vec<AliasRef>> {
    let mut aliases = Vec::new();
    let mut pages = client
        .list_agent_aliases()
        .agent_id(agent_id)
        .into_paginator()
        .send();
    while let Some(page) = pages.next().await {
        let page = page.context("Failed to list agent aliases")?;
        aliases.extend(page.agent_alias_summaries().iter().map(|alias| AliasRef {
            id: alias.agent_alias_id().to_string(),
            name: alias.agent_alias_name().to_string(),
        }));
    }
    Ok(aliases)
}

pub fn pick_alias(aliases: Vec<AliasRef>, wanted: &str) -> AliasLookup {
    if let Some(alias) = aliases.iter().find(|alias| alias.name == wanted) {
        return AliasLookup::Named(alias.clone());
    }
    match aliases.into_iter().next() {
        Some(first) => AliasLookup::FirstListed(first),
        None => AliasLookup::Missing,
    }
}

/// Where an agent stands relative to the states being waited out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentProgress {
    Settled(AgentStatus),
    Waiting(AgentStatus),
    Failed(String),
}

impl AgentProgress {
    pub fn from_status(
        status: AgentStatus,
        failure_reasons: &[String],
        transitional: &[AgentStatus],
    ) -> Self {
        if status == AgentStatus::Failed {
            Self::Failed(failure_reasons.join("; "))
        } else if transitional.contains(&status) {
            Self::Waiting(status)
        } else {
            Self::Settled(status)
        }
    }
}

/// Poll until the agent leaves the given transitional states.
///
/// Fails when the agent lands in `FAILED` or the deadline passes.
pub async fn wait_for_agent(
    client: &Client,
    agent_id: &str,
    transitional: &[AgentStatus],
    timeout: Duration,
    poll: Duration,
) -> Result<AgentStatus> {
    let describe = || describe_agent(client, agent_id, transitional);
    poll_agent(agent_id, describe, timeout, poll).await
}

async fn describe_agent(
    client: &Client,
    agent_id: &str,
    transitional: &[AgentStatus],
) -> Result<AgentProgress> {
    let output = client
        .get_agent()
        .agent_id(agent_id)
        .send()
        .await
        .with_context(|| format!("Failed to describe agent {}", agent_id))?;
    let agent = output
        .agent()
        .with_context(|| format!("GetAgent returned no agent for {}", agent_id))?;
    Ok(AgentProgress::from_status(
        agent.agent_status().clone(),
        agent.failure_reasons(),
        transitional,
    ))
}

async fn poll_agent<F, Fut>(
    agent_id: &str,
    mut describe: F,
    timeout: Duration,
    poll: Duration,
) -> Result<AgentStatus>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<AgentProgress>>,
{
    let deadline = Instant::now()
        .checked_add(timeout)
        .with_context(|| format!("Agent wait of {}s is too large", timeout.as_secs()))?;

    loop {
        let status = match describe().await? {
            AgentProgress::Settled(status) => return Ok(status),
            AgentProgress::Failed(reasons) => bail!("Agent {} failed: {}", agent_id, reasons),
            AgentProgress::Waiting(status) => status,
        };
        debug!(agent_id = %agent_id, status = %status.as_str(), "Agent status");

        if Instant::now() >= deadline {
            let waited = timeout.as_secs();
            bail!("Agent {} still {} after {}s", agent_id, status.as_str(), waited);
        }
        sleep(poll).await;
    }
}

/// The action group's function schema in SDK form
pub fn function_schema(functions: &[FunctionDefinition]) -> Result<FunctionSchema> {
    let mut converted = Vec::with_capacity(functions.len());
    for function in functions {
        let mut builder = Function::builder()
            .name(&function.name)
            .description(&function.description);
        for (name, parameter) in &function.parameters {
            let detail = ParameterDetail::builder()
                .description(&parameter.description)
                .required(parameter.required)
                .r#type(parameter_type(parameter.kind))
                .build()
                .with_context(|| format!("Invalid parameter {} of {}", name, function.name))?;
            builder = builder.parameters(name, detail);
        }
        converted.push(
            builder
                .build()
                .with_context(|| format!("Invalid function definition {}", function.name))?,
        );
    }
    Ok(FunctionSchema::Functions(converted))
}

fn parameter_type(kind: ParameterType) -> Type {
    match kind {
        ParameterType::String => Type::String,
        ParameterType::Number => Type::Number,
        ParameterType::Integer => Type::Integer,
        ParameterType::Boolean => Type::Boolean,
        ParameterType::Array => Type::Array,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oncall_agent_core::schema::action_group_functions;
    use std::cell::Cell;
    use std::future::ready;

    const QUICK: Duration = Duration::from_millis(1);

    fn alias(id: &str, name: &str) -> AliasRef {
        AliasRef {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_named_alias_wins() {
        let aliases = vec![alias("TSTALIASID", "AgentTestAlias"), alias("A1", "oncall-alias")];
        assert_eq!(
            pick_alias(aliases, "oncall-alias"),
            AliasLookup::Named(alias("A1", "oncall-alias"))
        );
    }

    #[test]
    fn test_falls_back_to_first_alias() {
        let aliases = vec![alias("TSTALIASID", "AgentTestAlias"), alias("A1", "other")];
        assert_eq!(
            pick_alias(aliases, "oncall-alias"),
            AliasLookup::FirstListed(alias("TSTALIASID", "AgentTestAlias"))
        );
        assert_eq!(pick_alias(Vec::new(), "oncall-alias"), AliasLookup::Missing);
    }

    #[test]
    fn test_function_schema_conversion() {
        let schema = function_schema(&action_group_functions()).unwrap();
        let FunctionSchema::Functions(functions) = schema else {
            panic!("expected a function list");
        };
        assert_eq!(functions.len(), 1);

        let function = &functions[0];
        assert_eq!(function.name(), "check_table_metadata");
        assert_eq!(
            function.description(),
            Some("get optimisation statistics for table")
        );

        let table_name = function
            .parameters()
            .and_then(|params| params.get("table_name"))
            .unwrap();
        assert_eq!(table_name.r#type(), &Type::String);
        assert_eq!(table_name.required(), Some(true));
    }

    #[test]
    fn test_agent_progress() {
        let creating = [AgentStatus::Creating];
        assert_eq!(
            AgentProgress::from_status(AgentStatus::Creating, &[], &creating),
            AgentProgress::Waiting(AgentStatus::Creating)
        );
        assert_eq!(
            AgentProgress::from_status(AgentStatus::NotPrepared, &[], &creating),
            AgentProgress::Settled(AgentStatus::NotPrepared)
        );
        let reasons = ["role not assumable".to_string(), "model denied".to_string()];
        assert_eq!(
            AgentProgress::from_status(AgentStatus::Failed, &reasons, &creating),
            AgentProgress::Failed("role not assumable; model denied".to_string())
        );
    }

    #[tokio::test]
    async fn test_poll_waits_until_settled() {
        let calls = Cell::new(0);
        let describe = || {
            calls.set(calls.get() + 1);
            ready(Ok(if calls.get() < 3 {
                AgentProgress::Waiting(AgentStatus::Preparing)
            } else {
                AgentProgress::Settled(AgentStatus::Prepared)
            }))
        };
        let status = poll_agent("AGENT1", describe, Duration::from_secs(5), QUICK)
            .await
            .unwrap();
        assert_eq!(status, AgentStatus::Prepared);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_poll_reports_failure_reasons() {
        let describe = || ready(Ok(AgentProgress::Failed("model denied".to_string())));
        let err = poll_agent("AGENT1", describe, Duration::from_secs(5), QUICK)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Agent AGENT1 failed: model denied");
    }

    #[tokio::test]
    async fn test_poll_gives_up_at_deadline() {
        let describe = || ready(Ok(AgentProgress::Waiting(AgentStatus::Creating)));
        let err = poll_agent("AGENT1", describe, Duration::ZERO, QUICK)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Agent AGENT1 still CREATING after 0s");
    }

    #[tokio::test]
    async fn test_oversized_wait_is_an_error() {
        let describe = || ready(Ok(AgentProgress::Settled(AgentStatus::Prepared)));
        let err = poll_agent("AGENT1", describe, Duration::MAX, QUICK)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
