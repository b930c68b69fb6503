// Action-group dispatch
//
// Maps the function named in the event onto the metadata check and wraps the
// result in the TEXT response the agent expects. A table name the warehouse
// cannot accept is answered with a REPROMPT so the agent asks the user again.

use oncall_agent_core::action::NO_FUNCTION_CALLED;
use oncall_agent_core::schema::{CHECK_TABLE_METADATA, TABLE_NAME_PARAM};
use oncall_agent_core::{
    ActionGroupEvent, ActionGroupResponse, CheckError, ResponseState, SecretStore,
    TableMetadataService, WarehouseConnector,
};
use tracing::{info, warn};

/// Handle one action-group event
pub async fn handle_action_group<S, C>(
    event: &ActionGroupEvent,
    service: &TableMetadataService<S, C>,
) -> Result<ActionGroupResponse, CheckError>
where
    S: SecretStore,
    C: WarehouseConnector,
{
    match event.function.as_str() {
        CHECK_TABLE_METADATA => {
            let table_name = event
                .parameter(TABLE_NAME_PARAM)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or(CheckError::MissingParameter(TABLE_NAME_PARAM))?;

            info!(table_name = %table_name, "Checking table metadata");
            let outcome = match service.check(table_name).await {
                Ok(outcome) => outcome,
                Err(err) if err.is_client_error() => {
                    warn!(table_name = %table_name, error = %err, "Rejected table name");
                    return Ok(ActionGroupResponse::text(event, err.to_string())
                        .with_state(ResponseState::Reprompt));
                }
                Err(err) => return Err(err),
            };

            Ok(ActionGroupResponse::text(
                event,
                format!("table design metadata for table {}: {}", table_name, outcome),
            ))
        }
        other => {
            warn!(function = other, "Unknown function requested");
            Ok(ActionGroupResponse::text(event, NO_FUNCTION_CALLED))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oncall_agent_core::{
        FunctionParameter, ResolvedSecret, StalenessPolicy, TableName, Warehouse, WarehouseSecret,
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct StaticSecrets;

    #[async_trait]
    impl SecretStore for StaticSecrets {
        async fn resolve(&self, secret_id: &str) -> Result<ResolvedSecret, CheckError> {
            Ok(ResolvedSecret {
                arn: format!("arn:aws:secretsmanager:us-east-1:123456789012:secret:{}", secret_id),
                secret: WarehouseSecret::parse(
                    secret_id,
                    r#"{"host":"h","port":"5439","username":"u","password":"p","dbClusterIdentifier":"analytics"}"#,
                )?,
            })
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    struct FakeSession {
        stats_off: Option<f64>,
        recorder: Recorder,
    }

    #[async_trait]
    impl Warehouse for FakeSession {
        async fn stats_off(&self, table: &TableName) -> Result<Option<f64>, CheckError> {
            self.recorder.0.lock().unwrap().push(format!("stats {}", table));
            Ok(self.stats_off)
        }

        async fn analyze(&self, table: &TableName) -> Result<(), CheckError> {
            self.recorder.0.lock().unwrap().push(table.analyze_statement());
            Ok(())
        }
    }

    struct FakeConnector {
        stats_off: Option<f64>,
        recorder: Recorder,
    }

    #[async_trait]
    impl WarehouseConnector for FakeConnector {
        type Session = FakeSession;

        async fn connect(&self, secret: &ResolvedSecret) -> Result<FakeSession, CheckError> {
            self.recorder
                .0
                .lock()
                .unwrap()
                .push(format!("connect {}", secret.secret.cluster_id));
            Ok(FakeSession {
                stats_off: self.stats_off,
                recorder: self.recorder.clone(),
            })
        }
    }

    fn service(
        stats_off: Option<f64>,
    ) -> (TableMetadataService<StaticSecrets, FakeConnector>, Recorder) {
        let recorder = Recorder::default();
        let service = TableMetadataService::new(
            StaticSecrets,
            FakeConnector {
                stats_off,
                recorder: recorder.clone(),
            },
            "de/redshift",
            StalenessPolicy::default(),
        );
        (service, recorder)
    }

    fn event(function: &str, table_name: Option<&str>) -> ActionGroupEvent {
        let mut event: ActionGroupEvent = serde_json::from_value(json!({
            "messageVersion": "1.0",
            "actionGroup": "DEActionGroup",
            "function": function,
        }))
        .unwrap();
        if let Some(value) = table_name {
            event.parameters.push(FunctionParameter {
                name: "table_name".to_string(),
                kind: "string".to_string(),
                value: value.to_string(),
            });
        }
        event
    }

    #[tokio::test]
    async fn test_stale_table_runs_analyze() {
        let (service, recorder) = service(Some(18.25));
        let request = event("check_table_metadata", Some("splittest"));
        let response = handle_action_group(&request, &service).await.unwrap();

        assert_eq!(
            response.body(),
            "table design metadata for table splittest: Table splittest had stats_off=18.25. ANALYZE completed."
        );
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                "connect analytics".to_string(),
                "stats splittest".to_string(),
                "ANALYZE splittest;".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_fresh_table_skips_analyze() {
        let (service, recorder) = service(Some(2.0));
        let request = event("check_table_metadata", Some("splittest"));
        let response = handle_action_group(&request, &service).await.unwrap();

        assert_eq!(
            response.body(),
            "table design metadata for table splittest: Table splittest stats_off=2.00. No ANALYZE needed."
        );
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let (service, _) = service(None);
        let response = handle_action_group(&event("check_table_metadata", Some("ghost")), &service)
            .await
            .unwrap();

        assert_eq!(
            response.body(),
            "table design metadata for table ghost: No metadata found for table_name ghost"
        );
    }

    #[tokio::test]
    async fn test_unknown_function_returns_default_body() {
        let (service, recorder) = service(Some(50.0));
        let response = handle_action_group(&event("drop_everything", Some("splittest")), &service)
            .await
            .unwrap();

        assert_eq!(response.body(), "Error, no function was called");
        assert_eq!(response.response.function, "drop_everything");
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_table_name_fails() {
        let (service, recorder) = service(Some(50.0));
        for table in [None, Some(""), Some("   ")] {
            let err = handle_action_group(&event("check_table_metadata", table), &service)
                .await
                .unwrap_err();
            assert!(matches!(err, CheckError::MissingParameter("table_name")));
        }
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_table_name_reprompts() {
        let (service, recorder) = service(Some(50.0));
        let request = event("check_table_metadata", Some("sales; drop table users"));
        let response = handle_action_group(&request, &service).await.unwrap();

        assert_eq!(
            response.response.function_response.response_state,
            Some(ResponseState::Reprompt)
        );
        assert!(response.body().starts_with("Invalid table name 'sales; drop table users'"));
        assert!(recorder.0.lock().unwrap().is_empty());
    }
}
