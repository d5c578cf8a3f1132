use serde_json::{json, Value};

use crate::adapters::artifact_store::ArtifactStore;
use crate::adapters::record_store::EnrichedRecordStore;
use crate::handlers::response::{
    dependency_error_response, error_response, normalize_event, not_found_response,
    success_response, validation_error_response, ApiGatewayResponse,
};
use crate::runtime::contract::AggregateResult;
use crate::runtime::storage_keys::{aggregated_artifact_key, ARTIFACT_CONTENT_TYPE};

pub const AGGREGATION_SUCCESS_MESSAGE: &str = "Aggregation successful";

/// Serializes every enriched record stored for a request into one artifact
/// and returns a time-limited retrieval URL.
///
/// Completion is not verified here: callers are expected to poll the
/// completion checker first. An artifact produced mid-request snapshots
/// whatever records exist at that moment.
pub fn handle_aggregate_event(
    event: Value,
    record_store: &dyn EnrichedRecordStore,
    artifact_store: &dyn ArtifactStore,
) -> ApiGatewayResponse {
    let payload = match normalize_event(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    let Some(request_id) = payload.get("request_id").and_then(Value::as_str) else {
        return validation_error_response("Missing 'request_id' in event payload.");
    };

    let records = match record_store.fetch_records(request_id) {
        Ok(value) => value,
        Err(error) => return dependency_error_response(&error),
    };
    if records.is_empty() {
        return not_found_response(&format!("No data found for request_id '{request_id}'"));
    }

    let body = match serde_json::to_vec_pretty(&records) {
        Ok(value) => value,
        Err(error) => {
            return error_response(
                500,
                json!({
                    "error": "serialization_error",
                    "message": error.to_string(),
                }),
            );
        }
    };

    let artifact_key = aggregated_artifact_key(request_id);
    match artifact_store.publish_artifact(&artifact_key, &body, ARTIFACT_CONTENT_TYPE) {
        Ok(url) => success_response(
            200,
            AggregateResult {
                message: AGGREGATION_SUCCESS_MESSAGE.to_string(),
                url,
            },
        ),
        Err(error) => dependency_error_response(&error),
    }
}
