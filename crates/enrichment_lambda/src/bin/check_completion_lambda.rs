use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use enrichment_lambda::adapters::aws::DynamoControlStore;
use enrichment_lambda::handlers::completion::handle_completion_event;
use enrichment_lambda::handlers::response::ApiGatewayResponse;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let control_table_name = std::env::var("CONTROL_TABLE_NAME")
        .map_err(|_| Error::from("CONTROL_TABLE_NAME must be configured"))?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let control_store =
        DynamoControlStore::new(aws_sdk_dynamodb::Client::new(&aws_config), control_table_name);

    Ok(handle_completion_event(event.payload, &control_store))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
