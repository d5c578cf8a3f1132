use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use enrichment_lambda::adapters::aws::{DynamoControlStore, SqsBatchQueue};
use enrichment_lambda::handlers::response::ApiGatewayResponse;
use enrichment_lambda::handlers::submit::handle_submit_event;
use enrichment_lambda::runtime::contract::DEFAULT_BATCH_SIZE;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let queue_url = std::env::var("BATCH_QUEUE_URL")
        .map_err(|_| Error::from("BATCH_QUEUE_URL must be configured"))?;
    let control_table_name = std::env::var("CONTROL_TABLE_NAME")
        .map_err(|_| Error::from("CONTROL_TABLE_NAME must be configured"))?;
    let batch_size = match std::env::var("BATCH_SIZE") {
        Ok(value) => value
            .parse::<usize>()
            .map_err(|error| Error::from(format!("BATCH_SIZE must be an integer: {error}")))?,
        Err(_) => DEFAULT_BATCH_SIZE,
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let control_store =
        DynamoControlStore::new(aws_sdk_dynamodb::Client::new(&aws_config), control_table_name);
    let queue = SqsBatchQueue::new(aws_sdk_sqs::Client::new(&aws_config), queue_url);

    Ok(handle_submit_event(
        event.payload,
        batch_size,
        &control_store,
        &queue,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
