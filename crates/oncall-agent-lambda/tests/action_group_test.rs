// Drives the handler with a captured Bedrock action-group event

use async_trait::async_trait;
use oncall_agent_core::{
    ActionGroupEvent, CheckError, ResolvedSecret, SecretStore, StalenessPolicy,
    TableMetadataService, TableName, Warehouse, WarehouseConnector, WarehouseSecret,
};
use oncall_agent_lambda::handle_action_group;
use serde_json::json;

const FIXTURE: &str = include_str!("fixtures/check_table_metadata.json");

struct InlineSecret(&'static str);

#[async_trait]
impl SecretStore for InlineSecret {
    async fn resolve(&self, secret_id: &str) -> Result<ResolvedSecret, CheckError> {
        Ok(ResolvedSecret {
            arn: secret_id.to_string(),
            secret: WarehouseSecret::parse(secret_id, self.0)?,
        })
    }
}

struct FixedStats(Option<f64>);

#[async_trait]
impl Warehouse for FixedStats {
    async fn stats_off(&self, _table: &TableName) -> Result<Option<f64>, CheckError> {
        Ok(self.0)
    }

    async fn analyze(&self, _table: &TableName) -> Result<(), CheckError> {
        Ok(())
    }
}

struct FixedConnector(Option<f64>);

#[async_trait]
impl WarehouseConnector for FixedConnector {
    type Session = FixedStats;

    async fn connect(&self, _secret: &ResolvedSecret) -> Result<FixedStats, CheckError> {
        Ok(FixedStats(self.0))
    }
}

const SECRET: &str = r#"{"host":"analytics.example.us-east-1.redshift.amazonaws.com","port":5439,"username":"oncall","password":"s3cret","dbClusterIdentifier":"analytics"}"#;

#[tokio::test]
async fn fixture_event_produces_analyze_response() {
    let event: ActionGroupEvent = serde_json::from_str(FIXTURE).unwrap();
    let service = TableMetadataService::new(
        InlineSecret(SECRET),
        FixedConnector(Some(34.0)),
        "arn:aws:secretsmanager:us-east-1:123456789012:secret:de/redshift",
        StalenessPolicy::default(),
    );

    let response = handle_action_group(&event, &service).await.unwrap();
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(
        value,
        json!({
            "messageVersion": "1.0",
            "response": {
                "actionGroup": "DEActionGroup",
                "function": "check_table_metadata",
                "functionResponse": {
                    "responseBody": {
                        "TEXT": {
                            "body": "table design metadata for table splittest: Table splittest had stats_off=34.00. ANALYZE completed."
                        }
                    }
                }
            },
            "sessionAttributes": {},
            "promptSessionAttributes": {}
        })
    );
}

#[tokio::test]
async fn malformed_secret_fails_the_invocation() {
    let event: ActionGroupEvent = serde_json::from_str(FIXTURE).unwrap();
    let service = TableMetadataService::new(
        InlineSecret(r#"{"host":"h"}"#),
        FixedConnector(Some(34.0)),
        "de/redshift",
        StalenessPolicy::default(),
    );

    let err = handle_action_group(&event, &service).await.unwrap_err();
    assert!(matches!(err, CheckError::MalformedSecret { .. }));
}
