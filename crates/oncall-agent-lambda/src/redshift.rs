// Redshift Data API warehouse adapter
//
// The Data API is asynchronous: a statement is submitted, then polled with
// DescribeStatement until it reaches a terminal state. Results are fetched
// with GetStatementResult.

use async_trait::async_trait;
use aws_sdk_redshiftdata::error::DisplayErrorContext;
use aws_sdk_redshiftdata::types::{Field, SqlParameter, StatusString};
use aws_sdk_redshiftdata::Client;
use oncall_agent_config::HandlerConfig;
use oncall_agent_core::metadata::Statement;
use oncall_agent_core::{CheckError, ResolvedSecret, TableName, Warehouse, WarehouseConnector};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Opens Data API sessions against the cluster named in the secret
#[derive(Debug, Clone)]
pub struct DataApiConnector {
    client: Client,
    default_database: String,
    poll_interval: Duration,
    statement_timeout: Duration,
}

impl DataApiConnector {
    pub fn new(client: Client, config: &HandlerConfig) -> Self {
        Self {
            client,
            default_database: config.database.clone(),
            poll_interval: config.poll_interval(),
            statement_timeout: config.statement_timeout(),
        }
    }
}

#[async_trait]
impl WarehouseConnector for DataApiConnector {
    type Session = DataApiSession;

    async fn connect(&self, secret: &ResolvedSecret) -> Result<DataApiSession, CheckError> {
        let database = secret.secret.database_or(&self.default_database).to_string();
        debug!(
            cluster = %secret.secret.cluster_id,
            database = %database,
            "Opening Data API session"
        );

        Ok(DataApiSession {
            client: self.client.clone(),
            cluster_id: secret.secret.cluster_id.clone(),
            secret_arn: secret.arn.clone(),
            database,
            poll_interval: self.poll_interval,
            statement_timeout: self.statement_timeout,
        })
    }
}

/// Statement execution bound to one cluster, database and secret
#[derive(Debug)]
pub struct DataApiSession {
    client: Client,
    cluster_id: String,
    secret_arn: String,
    database: String,
    poll_interval: Duration,
    statement_timeout: Duration,
}

impl DataApiSession {
    /// Submit a statement and wait for it; returns the statement id and
    /// whether it produced a result set
    async fn run(
        &self,
        operation: &'static str,
        statement: &Statement,
    ) -> Result<(String, bool), CheckError> {
        let mut request = self
            .client
            .execute_statement()
            .cluster_identifier(&self.cluster_id)
            .database(&self.database)
            .secret_arn(&self.secret_arn)
            .sql(&statement.sql);

        for (name, value) in &statement.parameters {
            let parameter = SqlParameter::builder()
                .name(*name)
                .value(value)
                .build()
                .map_err(|e| CheckError::warehouse(operation, e))?;
            request = request.parameters(parameter);
        }

        let submitted = request
            .send()
            .await
            .map_err(|e| CheckError::warehouse(operation, DisplayErrorContext(&e)))?;
        let id = submitted
            .id()
            .map(str::to_string)
            .ok_or_else(|| CheckError::warehouse(operation, "ExecuteStatement returned no id"))?;

        debug!(statement_id = %id, sql = %statement.sql, "Submitted statement");
        let has_result_set = self.wait(operation, &id).await?;
        Ok((id, has_result_set))
    }

    async fn wait(&self, operation: &'static str, id: &str) -> Result<bool, CheckError> {
        let outcome = poll_statement(
            operation,
            || self.describe(operation, id),
            self.poll_interval,
            self.statement_timeout,
        )
        .await?;

        match outcome {
            Some(has_result_set) => Ok(has_result_set),
            None => {
                self.cancel(id).await;
                Err(CheckError::warehouse(
                    operation,
                    format!(
                        "statement {} still running after {}s",
                        id,
                        self.statement_timeout.as_secs()
                    ),
                ))
            }
        }
    }

    async fn describe(
        &self,
        operation: &'static str,
        id: &str,
    ) -> Result<StatementState, CheckError> {
        let described = self
            .client
            .describe_statement()
            .id(id)
            .send()
            .await
            .map_err(|e| CheckError::warehouse(operation, DisplayErrorContext(&e)))?;

        Ok(StatementState::from_status(
            described.status(),
            described.has_result_set(),
            described.error(),
        ))
    }

    async fn cancel(&self, id: &str) {
        if let Err(e) = self.client.cancel_statement().id(id).send().await {
            warn!(statement_id = %id, "Failed to cancel statement: {}", DisplayErrorContext(&e));
        }
    }
}

#[async_trait]
impl Warehouse for DataApiSession {
    async fn stats_off(&self, table: &TableName) -> Result<Option<f64>, CheckError> {
        let (id, has_result_set) = self.run("query", &Statement::stats_off(table)).await?;
        if !has_result_set {
            return Ok(None);
        }

        let result = self
            .client
            .get_statement_result()
            .id(&id)
            .send()
            .await
            .map_err(|e| CheckError::warehouse("query", DisplayErrorContext(&e)))?;

        match result.records().first().and_then(|row| row.first()) {
            Some(field) => stats_off_from_field(field),
            None => Ok(None),
        }
    }

    async fn analyze(&self, table: &TableName) -> Result<(), CheckError> {
        self.run("analyze", &Statement::analyze(table)).await?;
        Ok(())
    }
}

/// Where a submitted statement stands after one DescribeStatement call
#[derive(Debug, Clone, PartialEq)]
enum StatementState {
    Finished { has_result_set: bool },
    Failed(String),
    Running,
}

impl StatementState {
    fn from_status(
        status: Option<&StatusString>,
        has_result_set: Option<bool>,
        error: Option<&str>,
    ) -> Self {
        match status {
            Some(StatusString::Finished) => StatementState::Finished {
                has_result_set: has_result_set.unwrap_or(false),
            },
            Some(StatusString::Failed) | Some(StatusString::Aborted) => StatementState::Failed(
                error.unwrap_or("statement did not complete").to_string(),
            ),
            _ => StatementState::Running,
        }
    }
}

/// Poll `describe` until the statement settles.
///
/// Returns `Some(has_result_set)` when it finished and `None` when the
/// timeout passed first; the caller owns cancellation.
async fn poll_statement<F, Fut>(
    operation: &'static str,
    mut describe: F,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<Option<bool>, CheckError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<StatementState, CheckError>>,
{
    let deadline = Instant::now().checked_add(timeout).ok_or_else(|| {
        CheckError::warehouse(
            operation,
            format!("statement timeout of {}s is too large", timeout.as_secs()),
        )
    })?;

    loop {
        match describe().await? {
            StatementState::Finished { has_result_set } => return Ok(Some(has_result_set)),
            StatementState::Failed(reason) => return Err(CheckError::warehouse(operation, reason)),
            StatementState::Running => {}
        }

        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(poll_interval).await;
    }
}

/// numeric columns arrive as strings; the other arms cover casts
fn stats_off_from_field(field: &Field) -> Result<Option<f64>, CheckError> {
    match field {
        Field::IsNull(true) => Ok(None),
        Field::StringValue(text) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| {
                CheckError::warehouse(
                    "query",
                    format!("stats_off '{}' is not numeric: {}", text, e),
                )
            }),
        Field::DoubleValue(value) => Ok(Some(*value)),
        Field::LongValue(value) => Ok(Some(*value as f64)),
        other => Err(CheckError::warehouse(
            "query",
            format!("unexpected stats_off field {:?}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{ready, Ready};

    #[test]
    fn test_numeric_string_field() {
        let field = Field::StringValue("12.50".to_string());
        assert_eq!(stats_off_from_field(&field).unwrap(), Some(12.5));
    }

    #[test]
    fn test_null_field_means_no_metadata() {
        assert_eq!(stats_off_from_field(&Field::IsNull(true)).unwrap(), None);
    }

    #[test]
    fn test_double_and_long_fields() {
        assert_eq!(stats_off_from_field(&Field::DoubleValue(3.25)).unwrap(), Some(3.25));
        assert_eq!(stats_off_from_field(&Field::LongValue(11)).unwrap(), Some(11.0));
    }

    #[test]
    fn test_statement_states() {
        assert_eq!(
            StatementState::from_status(Some(&StatusString::Finished), Some(true), None),
            StatementState::Finished { has_result_set: true }
        );
        assert_eq!(
            StatementState::from_status(Some(&StatusString::Finished), None, None),
            StatementState::Finished { has_result_set: false }
        );
        assert_eq!(
            StatementState::from_status(
                Some(&StatusString::Failed),
                None,
                Some("ERROR: relation \"splittest\" does not exist")
            ),
            StatementState::Failed("ERROR: relation \"splittest\" does not exist".to_string())
        );
        assert_eq!(
            StatementState::from_status(Some(&StatusString::Aborted), None, None),
            StatementState::Failed("statement did not complete".to_string())
        );
        for running in [
            StatusString::Submitted,
            StatusString::Picked,
            StatusString::Started,
        ] {
            assert_eq!(
                StatementState::from_status(Some(&running), None, None),
                StatementState::Running
            );
        }
        assert_eq!(StatementState::from_status(None, None, None), StatementState::Running);
    }

    type Described = Ready<Result<StatementState, CheckError>>;

    fn scripted(states: Vec<StatementState>) -> impl FnMut() -> Described {
        let mut states = states.into_iter();
        move || ready(Ok(states.next().unwrap_or(StatementState::Running)))
    }

    #[tokio::test]
    async fn test_poll_until_finished() {
        let describe = scripted(vec![
            StatementState::Running,
            StatementState::Running,
            StatementState::Finished { has_result_set: true },
        ]);
        let outcome = poll_statement(
            "query",
            describe,
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Some(true));
    }

    #[tokio::test]
    async fn test_poll_surfaces_engine_error() {
        let describe = scripted(vec![
            StatementState::Running,
            StatementState::Failed("permission denied for relation splittest".to_string()),
        ]);
        let err = poll_statement(
            "analyze",
            describe,
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            CheckError::warehouse("analyze", "permission denied for relation splittest")
                .to_string()
        );
    }

    #[tokio::test]
    async fn test_poll_gives_up_at_deadline() {
        let mut calls = 0;
        let describe = || {
            calls += 1;
            ready(Ok(StatementState::Running))
        };
        let outcome = poll_statement(
            "query",
            describe,
            Duration::from_millis(5),
            Duration::from_millis(20),
        )
        .await
        .unwrap();
        assert_eq!(outcome, None);
        assert!(calls >= 2);
    }

    #[tokio::test]
    async fn test_oversized_timeout_is_an_error() {
        let err = poll_statement(
            "query",
            scripted(vec![]),
            Duration::from_millis(1),
            Duration::from_secs(u64::MAX),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_garbage_is_an_error() {
        let err = stats_off_from_field(&Field::StringValue("n/a".to_string())).unwrap_err();
        assert!(err.to_string().contains("not numeric"));
        assert!(stats_off_from_field(&Field::BooleanValue(true)).is_err());
    }
}
