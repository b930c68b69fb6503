// Table metadata check
//
// Resolve the warehouse secret, read `stats_off` from svv_table_info and run
// ANALYZE when the statistic is past the staleness threshold.

use crate::error::CheckError;
use crate::secret::{ResolvedSecret, SecretStore};
use crate::table::TableName;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info};

/// `stats_off` above this value triggers ANALYZE
pub const DEFAULT_STATS_OFF_THRESHOLD: f64 = 10.0;

const STATS_OFF_SQL: &str = r#"select stats_off from svv_table_info where "table" = :table_name"#;
const SCHEMA_FILTER_SQL: &str = r#" and "schema" = :schema_name"#;

/// A parameterised statement; parameters bind by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub parameters: Vec<(&'static str, String)>,
}

impl Statement {
    /// Query reading `stats_off` for `table`
    pub fn stats_off(table: &TableName) -> Self {
        let mut sql = STATS_OFF_SQL.to_string();
        let mut parameters = vec![("table_name", table.table().to_string())];
        if let Some(schema) = table.schema() {
            sql.push_str(SCHEMA_FILTER_SQL);
            parameters.push(("schema_name", schema.to_string()));
        }
        Self { sql, parameters }
    }

    /// ANALYZE cannot take bind parameters; the name is a validated identifier
    pub fn analyze(table: &TableName) -> Self {
        Self {
            sql: table.analyze_statement(),
            parameters: Vec::new(),
        }
    }
}

/// An open warehouse session
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// `stats_off` for the table, `None` when svv_table_info has no row for it
    async fn stats_off(&self, table: &TableName) -> Result<Option<f64>, CheckError>;

    /// Refresh planner statistics for the table
    async fn analyze(&self, table: &TableName) -> Result<(), CheckError>;
}

/// Opens warehouse sessions from a resolved secret
#[async_trait]
pub trait WarehouseConnector: Send + Sync {
    type Session: Warehouse;

    async fn connect(&self, secret: &ResolvedSecret) -> Result<Self::Session, CheckError>;
}

/// Threshold gating the maintenance action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StalenessPolicy {
    pub threshold: f64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_STATS_OFF_THRESHOLD,
        }
    }
}

impl StalenessPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn needs_analyze(&self, stats_off: f64) -> bool {
        stats_off > self.threshold
    }
}

/// Result of a metadata check
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataOutcome {
    /// Statistics were stale and ANALYZE ran
    Analyzed { table: TableName, stats_off: f64 },
    /// Statistics were within the threshold
    Fresh { table: TableName, stats_off: f64 },
    /// svv_table_info had nothing for the table
    NotFound { table: TableName },
}

impl fmt::Display for MetadataOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataOutcome::Analyzed { table, stats_off } => write!(
                f,
                "Table {} had stats_off={:.2}. ANALYZE completed.",
                table, stats_off
            ),
            MetadataOutcome::Fresh { table, stats_off } => write!(
                f,
                "Table {} stats_off={:.2}. No ANALYZE needed.",
                table, stats_off
            ),
            MetadataOutcome::NotFound { table } => {
                write!(f, "No metadata found for table_name {}", table)
            }
        }
    }
}

/// Read `stats_off` and run ANALYZE when the policy says so
pub async fn check_table_metadata<W>(
    warehouse: &W,
    table: &TableName,
    policy: StalenessPolicy,
) -> Result<MetadataOutcome, CheckError>
where
    W: Warehouse + ?Sized,
{
    let Some(stats_off) = warehouse.stats_off(table).await? else {
        info!(table = %table, "No svv_table_info row for table");
        return Ok(MetadataOutcome::NotFound {
            table: table.clone(),
        });
    };

    debug!(table = %table, stats_off, threshold = policy.threshold, "Read table statistics");

    if policy.needs_analyze(stats_off) {
        info!(table = %table, stats_off, "Running ANALYZE");
        warehouse.analyze(table).await?;
        Ok(MetadataOutcome::Analyzed {
            table: table.clone(),
            stats_off,
        })
    } else {
        Ok(MetadataOutcome::Fresh {
            table: table.clone(),
            stats_off,
        })
    }
}

/// Secret resolution plus warehouse access for one configured secret
#[derive(Debug, Clone)]
pub struct TableMetadataService<S, C> {
    secrets: S,
    connector: C,
    secret_id: String,
    policy: StalenessPolicy,
}

impl<S, C> TableMetadataService<S, C>
where
    S: SecretStore,
    C: WarehouseConnector,
{
    pub fn new(
        secrets: S,
        connector: C,
        secret_id: impl Into<String>,
        policy: StalenessPolicy,
    ) -> Self {
        Self {
            secrets,
            connector,
            secret_id: secret_id.into(),
            policy,
        }
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    /// Check a table by its raw (agent supplied) name
    pub async fn check(&self, raw_table: &str) -> Result<MetadataOutcome, CheckError> {
        let table: TableName = raw_table.parse()?;

        let secret = self.secrets.resolve(&self.secret_id).await?;
        debug!(
            secret_arn = %secret.arn,
            cluster = %secret.secret.cluster_id,
            "Resolved warehouse secret"
        );

        let session = self.connector.connect(&secret).await?;
        check_table_metadata(&session, &table, self.policy).await
    }
}
