use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use enrichment_lambda::adapters::aws::{DynamoEnrichedRecordStore, S3ArtifactStore};
use enrichment_lambda::handlers::aggregate::handle_aggregate_event;
use enrichment_lambda::handlers::response::ApiGatewayResponse;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let enriched_table_name = std::env::var("ENRICHED_TABLE_NAME")
        .map_err(|_| Error::from("ENRICHED_TABLE_NAME must be configured"))?;
    let bucket = std::env::var("ARTIFACT_BUCKET_NAME")
        .map_err(|_| Error::from("ARTIFACT_BUCKET_NAME must be configured"))?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let record_store = DynamoEnrichedRecordStore::new(
        aws_sdk_dynamodb::Client::new(&aws_config),
        enriched_table_name,
    );
    let artifact_store = S3ArtifactStore::new(aws_sdk_s3::Client::new(&aws_config), bucket);

    Ok(handle_aggregate_event(
        event.payload,
        &record_store,
        &artifact_store,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
