//! IAM policy documents for the handler and agent roles

use serde_json::{json, Value};

pub const LAMBDA_BASIC_EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const BEDROCK_SERVICE_PRINCIPAL: &str = "bedrock.amazonaws.com";

/// Trust policy letting `service` assume a role
pub fn trust_policy(service: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": service },
            "Action": "sts:AssumeRole"
        }]
    })
}

/// Inline policy for the handler role.
///
/// The Data API is asynchronous, so polling and result retrieval need their
/// own actions alongside `ExecuteStatement`.
pub fn handler_inline_policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "AmazonRedshiftDataAPIPolicy",
                "Effect": "Allow",
                "Action": [
                    "redshift-data:ExecuteStatement",
                    "redshift-data:DescribeStatement",
                    "redshift-data:GetStatementResult",
                    "redshift-data:CancelStatement"
                ],
                "Resource": "*"
            },
            {
                "Sid": "AmazonSecretsManagerPolicy",
                "Effect": "Allow",
                "Action": "secretsmanager:GetSecretValue",
                "Resource": "*"
            }
        ]
    })
}

/// Managed policy letting the agent call its model through the inference profile
pub fn bedrock_model_policy(foundation_model: &str, inference_profile: &str) -> Value {
    let profile_arn = format!("arn:aws:bedrock:*:*:inference-profile/{}", inference_profile);
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Sid": "AmazonBedrockAgentBedrockFoundationModelPolicy",
                "Effect": "Allow",
                "Action": "bedrock:InvokeModel",
                "Resource": [
                    format!("arn:aws:bedrock:*::foundation-model/{}", foundation_model),
                    &profile_arn
                ]
            },
            {
                "Sid": "AmazonBedrockAgentBedrockGetInferenceProfile",
                "Effect": "Allow",
                "Action": [
                    "bedrock:GetInferenceProfile",
                    "bedrock:ListInferenceProfiles",
                    "bedrock:UseInferenceProfile"
                ],
                "Resource": [&profile_arn]
            }
        ]
    })
}
