// AWS Lambda runtime adapter
//
// Serves the Bedrock agent action group. Secrets come from Secrets Manager and
// warehouse statements run through the Redshift Data API.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use oncall_agent_config::{AppConfig, LogFormat, LoggingConfig};
use oncall_agent_core::{
    ActionGroupEvent, ActionGroupResponse, StalenessPolicy, TableMetadataService,
};
use std::sync::Arc;
use tracing::{debug, error, info};

mod handlers;
mod redshift;
mod secrets;

pub use handlers::handle_action_group;
pub use redshift::DataApiConnector;
pub use secrets::SecretsManagerStore;

pub(crate) struct LambdaState {
    pub service: TableMetadataService<SecretsManagerStore, DataApiConnector>,
}

/// Lambda handler for action-group invocations
async fn handle_request(
    event: LambdaEvent<ActionGroupEvent>,
    state: Arc<LambdaState>,
) -> Result<ActionGroupResponse, Error> {
    let (request, context) = event.into_parts();

    info!(
        request_id = %context.request_id,
        action_group = %request.action_group,
        function = %request.function,
        session_id = %request.session_id,
        "Received action-group invocation"
    );
    debug!(parameters = ?request.parameters, "Invocation parameters");

    match handle_action_group(&request, &state.service).await {
        Ok(response) => {
            debug!(body = %response.body(), "Returning function response");
            Ok(response)
        }
        Err(err) => {
            error!(function = %request.function, "Action failed: {}", err);
            Err(err.into())
        }
    }
}

/// Initialize tracing/logging from the logging config
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    // CloudWatch does not render ANSI colours
    let _ = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_ansi(false).without_time()),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_ansi(false).without_time()),
        ),
    };
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    let config = AppConfig::load()
        .map_err(|e| Error::from(format!("Failed to load configuration: {:#}", e)))?;
    init_tracing(&config.logging);

    // Clients are built once per cold start and reused across invocations
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let secrets = SecretsManagerStore::new(aws_sdk_secretsmanager::Client::new(&sdk_config));
    let connector = DataApiConnector::new(
        aws_sdk_redshiftdata::Client::new(&sdk_config),
        &config.handler,
    );

    let database = config.handler.database.clone();
    let service = TableMetadataService::new(
        secrets,
        connector,
        config.handler.secret_id,
        StalenessPolicy::new(config.handler.stats_off_threshold),
    );
    info!(
        secret_id = %service.secret_id(),
        database = %database,
        threshold = service.policy().threshold,
        "Action-group handler ready"
    );

    let state = Arc::new(LambdaState { service });

    lambda_runtime::run(service_fn(move |event: LambdaEvent<ActionGroupEvent>| {
        let state = state.clone();
        async move { handle_request(event, state).await }
    }))
    .await
}
