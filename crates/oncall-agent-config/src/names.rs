//! Resource naming derived from the agent name, region and account

use crate::AppConfig;

/// Geographic prefixes of cross-region inference profile ids
const PROFILE_GEO_PREFIXES: &[&str] = &["us", "eu", "apac", "us-gov", "ca", "jp", "au", "global"];

/// Names of every resource the deployment touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub region: String,
    pub account_id: String,
    /// `{region}-{account_id}`
    pub suffix: String,
    pub agent: String,
    pub agent_role: String,
    pub agent_alias: String,
    pub bedrock_policy: String,
    pub lambda_role: String,
    pub lambda_inline_policy: String,
    pub lambda_function: String,
    pub action_group: String,
}

impl ResourceNames {
    pub fn derive(config: &AppConfig, region: &str, account_id: &str) -> Self {
        let suffix = format!("{}-{}", region, account_id);
        let agent = config.agent.name.clone();

        let lambda_role = config
            .lambda
            .role_name
            .clone()
            .unwrap_or_else(|| format!("{}-lambda-role-{}", agent, suffix));

        Self {
            region: region.to_string(),
            account_id: account_id.to_string(),
            agent_role: config
                .agent
                .role_name
                .clone()
                .unwrap_or_else(|| format!("AmazonBedrockExecutionRoleForAgents_{}", agent)),
            agent_alias: config
                .agent
                .alias_name
                .clone()
                .unwrap_or_else(|| format!("{}-alias", agent)),
            bedrock_policy: config
                .agent
                .bedrock_policy_name
                .clone()
                .unwrap_or_else(|| format!("{}-ba-{}", agent, suffix)),
            lambda_inline_policy: format!("{}-inline-policy", lambda_role),
            lambda_function: config
                .lambda
                .function_name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", agent, suffix)),
            lambda_role,
            action_group: config.action_group.name.clone(),
            agent,
            suffix,
        }
    }

    pub fn bedrock_policy_arn(&self) -> String {
        format!("arn:aws:iam::{}:policy/{}", self.account_id, self.bedrock_policy)
    }

    pub fn agent_arn(&self, agent_id: &str) -> String {
        format!(
            "arn:aws:bedrock:{}:{}:agent/{}",
            self.region, self.account_id, agent_id
        )
    }
}

/// Foundation model id behind an inference profile id.
///
/// `us.amazon.nova-lite-v1:0` maps to `amazon.nova-lite-v1:0`; ids without a
/// geographic prefix are returned unchanged.
pub fn foundation_model(inference_profile: &str) -> &str {
    match inference_profile.split_once('.') {
        Some((prefix, rest)) if PROFILE_GEO_PREFIXES.contains(&prefix) => rest,
        _ => inference_profile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_names() {
        let config = AppConfig::default();
        let names = ResourceNames::derive(&config, "us-east-1", "123456789012");

        assert_eq!(names.suffix, "us-east-1-123456789012");
        assert_eq!(
            names.bedrock_policy,
            "de_oncall_agent_function_def-ba-us-east-1-123456789012"
        );
        assert_eq!(
            names.agent_role,
            "AmazonBedrockExecutionRoleForAgents_de_oncall_agent_function_def"
        );
        assert_eq!(names.agent_alias, "de_oncall_agent_function_def-alias");
        assert_eq!(
            names.lambda_role,
            "de_oncall_agent_function_def-lambda-role-us-east-1-123456789012"
        );
        assert_eq!(
            names.lambda_inline_policy,
            "de_oncall_agent_function_def-lambda-role-us-east-1-123456789012-inline-policy"
        );
        assert_eq!(
            names.lambda_function,
            "de_oncall_agent_function_def-us-east-1-123456789012"
        );
        assert_eq!(names.action_group, "DEActionGroup");
    }

    #[test]
    fn test_explicit_names_win() {
        let mut config = AppConfig::default();
        config.lambda.function_name = Some("oncall-fn".to_string());
        config.agent.alias_name = Some("live".to_string());

        let names = ResourceNames::derive(&config, "eu-west-1", "210987654321");
        assert_eq!(names.lambda_function, "oncall-fn");
        assert_eq!(names.agent_alias, "live");
    }

    #[test]
    fn test_arns() {
        let names = ResourceNames::derive(&AppConfig::default(), "us-east-1", "123456789012");
        assert_eq!(
            names.bedrock_policy_arn(),
            "arn:aws:iam::123456789012:policy/de_oncall_agent_function_def-ba-us-east-1-123456789012"
        );
        assert_eq!(
            names.agent_arn("AGENT123"),
            "arn:aws:bedrock:us-east-1:123456789012:agent/AGENT123"
        );
    }

    #[test]
    fn test_foundation_model() {
        assert_eq!(foundation_model("us.amazon.nova-lite-v1:0"), "amazon.nova-lite-v1:0");
        assert_eq!(foundation_model("apac.amazon.nova-lite-v1:0"), "amazon.nova-lite-v1:0");
        assert_eq!(foundation_model("amazon.nova-lite-v1:0"), "amazon.nova-lite-v1:0");
        assert_eq!(
            foundation_model("anthropic.claude-3-haiku-20240307-v1:0"),
            "anthropic.claude-3-haiku-20240307-v1:0"
        );
    }
}
