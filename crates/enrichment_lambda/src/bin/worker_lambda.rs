use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};

use enrichment_lambda::adapters::aws::{DynamoControlStore, DynamoEnrichedRecordStore};
use enrichment_lambda::handlers::worker::handle_batch_message;
use enrichment_lambda::runtime::contract::BatchMessage;
use enrichment_lambda::runtime::enrichment::StrategyKind;

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let control_table_name = std::env::var("CONTROL_TABLE_NAME")
        .map_err(|_| Error::from("CONTROL_TABLE_NAME must be configured"))?;
    let enriched_table_name = std::env::var("ENRICHED_TABLE_NAME")
        .map_err(|_| Error::from("ENRICHED_TABLE_NAME must be configured"))?;
    let strategy =
        StrategyKind::from_name(&std::env::var("ENRICHMENT_STRATEGY").unwrap_or_default());

    let messages = decode_sqs_messages(&event.payload)?;

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let dynamodb_client = aws_sdk_dynamodb::Client::new(&aws_config);
    let control_store = DynamoControlStore::new(dynamodb_client.clone(), control_table_name);
    let record_store = DynamoEnrichedRecordStore::new(dynamodb_client, enriched_table_name);

    // Any failure propagates unacknowledged so the queue redelivers the
    // whole message.
    for message in messages {
        handle_batch_message(&message, strategy, &record_store, &control_store)
            .map_err(|error| Error::from(error.message))?;
    }

    Ok(json!({ "status": "ok" }))
}

fn decode_sqs_messages(event: &Value) -> Result<Vec<BatchMessage>, Error> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::from("SQS event must include Records array"))?;

    let mut messages = Vec::with_capacity(records.len());
    for record in records {
        let body = record
            .get("body")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::from("SQS record body must be a string"))?;
        let message: BatchMessage = serde_json::from_str(body)
            .map_err(|error| Error::from(format!("invalid batch message payload: {error}")))?;
        messages.push(message);
    }

    Ok(messages)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
