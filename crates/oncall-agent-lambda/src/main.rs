// AWS Lambda binary entry point
//
// Build with: cargo lambda build --release -p oncall-agent-lambda --output-format zip
//
// The lambda_runtime crate provides the tokio runtime, so we use #[tokio::main]

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    oncall_agent_lambda::run().await
}
