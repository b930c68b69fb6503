// oncall-agent-core - Platform-agnostic logic for the data-engineering on-call agent
//
// This crate holds everything that does not talk to AWS directly:
// - Bedrock agent action-group event/response types
// - The function schema advertised to the agent
// - Table name parsing and the staleness check that gates ANALYZE
// - Seams (SecretStore, WarehouseConnector) implemented by the Lambda runtime
//
// Philosophy: no runtime, no SDK clients. Adapters live in the platform crates.

pub mod action;
pub mod error;
pub mod metadata;
pub mod schema;
pub mod secret;
pub mod table;

pub use action::{ActionGroupEvent, ActionGroupResponse, FunctionParameter, ResponseState};
pub use error::CheckError;
pub use metadata::{
    check_table_metadata, MetadataOutcome, StalenessPolicy, TableMetadataService, Warehouse,
    WarehouseConnector, DEFAULT_STATS_OFF_THRESHOLD,
};
pub use schema::{FunctionDefinition, ParameterDefinition, ParameterType};
pub use secret::{ResolvedSecret, SecretStore, WarehouseSecret};
pub use table::TableName;
