use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use serde_json::Value;

use crate::adapters::artifact_store::ArtifactStore;
use crate::adapters::control_store::{BatchAcknowledgement, ControlStore};
use crate::adapters::queue::BatchQueue;
use crate::adapters::record_store::EnrichedRecordStore;
use crate::runtime::contract::{ControlRecord, Record};
use crate::runtime::storage_keys::PRESIGNED_URL_EXPIRY_SECONDS;

const REQUEST_ID_ATTRIBUTE: &str = "request_id";
const EXPECTED_BATCHES_ATTRIBUTE: &str = "expected_batches";
const PROCESSED_BATCHES_ATTRIBUTE: &str = "processed_batches";
const PROCESSED_BATCH_IDS_ATTRIBUTE: &str = "processed_batch_ids";

pub struct SqsBatchQueue {
    queue_url: String,
    sqs_client: aws_sdk_sqs::Client,
}

impl SqsBatchQueue {
    pub fn new(sqs_client: aws_sdk_sqs::Client, queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            sqs_client,
        }
    }
}

impl BatchQueue for SqsBatchQueue {
    fn send_message(&self, payload: &[u8]) -> Result<(), String> {
        let body = String::from_utf8(payload.to_vec())
            .map_err(|error| format!("invalid UTF-8 batch payload: {error}"))?;
        let client = self.sqs_client.clone();
        let queue_url = self.queue_url.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .send_message()
                    .queue_url(queue_url)
                    .message_body(body)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to enqueue batch message: {error}"))
            })
        })
    }
}

pub struct DynamoControlStore {
    table_name: String,
    dynamodb_client: aws_sdk_dynamodb::Client,
}

impl DynamoControlStore {
    pub fn new(dynamodb_client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            dynamodb_client,
        }
    }
}

impl ControlStore for DynamoControlStore {
    fn initialize_request(&self, request_id: &str, expected_batches: usize) -> Result<(), String> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();
        let request_id = request_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_item()
                    .table_name(table_name)
                    .item(REQUEST_ID_ATTRIBUTE, AttributeValue::S(request_id))
                    .item(
                        EXPECTED_BATCHES_ATTRIBUTE,
                        AttributeValue::N(expected_batches.to_string()),
                    )
                    .item(PROCESSED_BATCHES_ATTRIBUTE, AttributeValue::N("0".to_string()))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to initialize control record: {error}"))
            })
        })
    }

    fn fetch_control_record(&self, request_id: &str) -> Result<Option<ControlRecord>, String> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();
        let request_id = request_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_item()
                    .table_name(table_name)
                    .key(REQUEST_ID_ATTRIBUTE, AttributeValue::S(request_id.clone()))
                    .send()
                    .await
                    .map_err(|error| format!("failed to read control record: {error}"))?;

                match output.item() {
                    Some(item) => control_record_from_item(&request_id, item).map(Some),
                    None => Ok(None),
                }
            })
        })
    }

    fn mark_batch_processed(
        &self,
        request_id: &str,
        batch_id: usize,
    ) -> Result<BatchAcknowledgement, String> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();
        let request_id = request_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                // A single conditional update keeps the increment and the
                // per-batch marker atomic with respect to concurrent workers.
                let update = client
                    .update_item()
                    .table_name(&table_name)
                    .key(REQUEST_ID_ATTRIBUTE, AttributeValue::S(request_id.clone()))
                    .update_expression(format!(
                        "ADD {PROCESSED_BATCHES_ATTRIBUTE} :increment, \
                         {PROCESSED_BATCH_IDS_ATTRIBUTE} :batch_id_set"
                    ))
                    .condition_expression(format!(
                        "attribute_exists({REQUEST_ID_ATTRIBUTE}) AND \
                         NOT contains({PROCESSED_BATCH_IDS_ATTRIBUTE}, :batch_id)"
                    ))
                    .expression_attribute_values(":increment", AttributeValue::N("1".to_string()))
                    .expression_attribute_values(
                        ":batch_id_set",
                        AttributeValue::Ns(vec![batch_id.to_string()]),
                    )
                    .expression_attribute_values(
                        ":batch_id",
                        AttributeValue::N(batch_id.to_string()),
                    )
                    .send()
                    .await;

                let error = match update {
                    Ok(_) => return Ok(BatchAcknowledgement::Counted),
                    Err(error) => error.into_service_error(),
                };

                if !error.is_conditional_check_failed_exception() {
                    return Err(format!("failed to mark batch processed: {error}"));
                }

                // The condition also fails when no control record exists;
                // only a present record makes this a redelivery.
                let output = client
                    .get_item()
                    .table_name(&table_name)
                    .key(REQUEST_ID_ATTRIBUTE, AttributeValue::S(request_id.clone()))
                    .send()
                    .await
                    .map_err(|error| format!("failed to read control record: {error}"))?;

                if output.item().is_some() {
                    Ok(BatchAcknowledgement::AlreadyCounted)
                } else {
                    Err(format!("control record not found for request '{request_id}'"))
                }
            })
        })
    }
}

pub struct DynamoEnrichedRecordStore {
    table_name: String,
    dynamodb_client: aws_sdk_dynamodb::Client,
}

impl DynamoEnrichedRecordStore {
    pub fn new(dynamodb_client: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            dynamodb_client,
        }
    }
}

impl EnrichedRecordStore for DynamoEnrichedRecordStore {
    fn save_records(&self, request_id: &str, records: &[Record]) -> Result<(), String> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();
        let request_id = request_id.to_string();
        let records = records.to_vec();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                for record in &records {
                    let mut request = client
                        .put_item()
                        .table_name(&table_name)
                        .item(REQUEST_ID_ATTRIBUTE, AttributeValue::S(request_id.clone()));
                    for (field, value) in record {
                        request = request.item(field, json_to_attribute(value)?);
                    }
                    request
                        .send()
                        .await
                        .map(|_| ())
                        .map_err(|error| format!("failed to persist enriched record: {error}"))?;
                }
                Ok(())
            })
        })
    }

    fn fetch_records(&self, request_id: &str) -> Result<Vec<Record>, String> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();
        let request_id = request_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut items = client
                    .query()
                    .table_name(table_name)
                    .key_condition_expression(format!("{REQUEST_ID_ATTRIBUTE} = :request_id"))
                    .expression_attribute_values(":request_id", AttributeValue::S(request_id))
                    .into_paginator()
                    .items()
                    .send();

                let mut records = Vec::new();
                while let Some(item) = items.next().await {
                    let item = item
                        .map_err(|error| format!("failed to query enriched records: {error}"))?;
                    records.push(record_from_item(&item)?);
                }
                Ok(records)
            })
        })
    }
}

pub struct S3ArtifactStore {
    bucket: String,
    s3_client: aws_sdk_s3::Client,
}

impl S3ArtifactStore {
    pub fn new(s3_client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            s3_client,
        }
    }
}

impl ArtifactStore for S3ArtifactStore {
    fn publish_artifact(
        &self,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<String, String> {
        let client = self.s3_client.clone();
        let bucket = self.bucket.clone();
        let object_key = key.to_string();
        let content_type = content_type.to_string();
        let body_bytes = body.to_vec();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(&object_key)
                    .content_type(content_type)
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map_err(|error| format!("failed to upload artifact to s3: {error}"))?;

                let presigning =
                    PresigningConfig::expires_in(Duration::from_secs(PRESIGNED_URL_EXPIRY_SECONDS))
                        .map_err(|error| format!("invalid presigning configuration: {error}"))?;
                let presigned = client
                    .get_object()
                    .bucket(bucket)
                    .key(object_key)
                    .presigned(presigning)
                    .await
                    .map_err(|error| format!("failed to presign artifact url: {error}"))?;

                Ok(presigned.uri().to_string())
            })
        })
    }
}

fn control_record_from_item(
    request_id: &str,
    item: &HashMap<String, AttributeValue>,
) -> Result<ControlRecord, String> {
    Ok(ControlRecord {
        request_id: request_id.to_string(),
        expected_batches: numeric_attribute(item, EXPECTED_BATCHES_ATTRIBUTE)?,
        processed_batches: numeric_attribute(item, PROCESSED_BATCHES_ATTRIBUTE)?,
    })
}

fn numeric_attribute(item: &HashMap<String, AttributeValue>, name: &str) -> Result<usize, String> {
    item.get(name)
        .and_then(|attribute| attribute.as_n().ok())
        .ok_or_else(|| format!("control record is missing numeric attribute '{name}'"))?
        .parse::<usize>()
        .map_err(|error| format!("control record attribute '{name}' is not a count: {error}"))
}

fn record_from_item(item: &HashMap<String, AttributeValue>) -> Result<Record, String> {
    let mut record = Record::new();
    for (field, attribute) in item {
        record.insert(field.clone(), attribute_to_json(attribute)?);
    }
    Ok(record)
}

fn json_to_attribute(value: &Value) -> Result<AttributeValue, String> {
    match value {
        Value::Null => Ok(AttributeValue::Null(true)),
        Value::Bool(flag) => Ok(AttributeValue::Bool(*flag)),
        Value::Number(number) => Ok(AttributeValue::N(number.to_string())),
        Value::String(text) => Ok(AttributeValue::S(text.clone())),
        Value::Array(items) => items
            .iter()
            .map(json_to_attribute)
            .collect::<Result<Vec<_>, _>>()
            .map(AttributeValue::L),
        Value::Object(fields) => {
            let mut attributes = HashMap::with_capacity(fields.len());
            for (field, nested) in fields {
                attributes.insert(field.clone(), json_to_attribute(nested)?);
            }
            Ok(AttributeValue::M(attributes))
        }
    }
}

fn attribute_to_json(attribute: &AttributeValue) -> Result<Value, String> {
    match attribute {
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::Bool(flag) => Ok(Value::Bool(*flag)),
        AttributeValue::S(text) => Ok(Value::String(text.clone())),
        AttributeValue::N(number) => serde_json::from_str::<serde_json::Number>(number)
            .map(Value::Number)
            .map_err(|error| format!("unreadable numeric attribute '{number}': {error}")),
        AttributeValue::L(items) => items
            .iter()
            .map(attribute_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        AttributeValue::M(fields) => {
            let mut object = serde_json::Map::with_capacity(fields.len());
            for (field, nested) in fields {
                object.insert(field.clone(), attribute_to_json(nested)?);
            }
            Ok(Value::Object(object))
        }
        AttributeValue::Ss(items) => Ok(Value::Array(
            items.iter().cloned().map(Value::String).collect(),
        )),
        AttributeValue::Ns(items) => items
            .iter()
            .map(|number| {
                serde_json::from_str::<serde_json::Number>(number)
                    .map(Value::Number)
                    .map_err(|error| format!("unreadable numeric attribute '{number}': {error}"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(format!("unsupported stored attribute type: {other:?}")),
    }
}
