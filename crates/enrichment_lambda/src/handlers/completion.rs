use serde_json::Value;

use crate::adapters::control_store::ControlStore;
use crate::handlers::response::{
    dependency_error_response, normalize_event, not_found_response, success_response,
    validation_error_response, ApiGatewayResponse,
};
use crate::runtime::contract::CompletionResponse;

/// Reports whether every batch of a request has been processed. Pure read;
/// the status is derived from the control record counters.
pub fn handle_completion_event(
    event: Value,
    control_store: &dyn ControlStore,
) -> ApiGatewayResponse {
    let payload = match normalize_event(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    let Some(request_id) = payload.get("request_id").and_then(Value::as_str) else {
        return validation_error_response("Missing 'request_id' in event payload.");
    };

    match control_store.fetch_control_record(request_id) {
        Ok(Some(record)) => success_response(
            200,
            CompletionResponse {
                status: record.status(),
            },
        ),
        Ok(None) => not_found_response(&format!("Request ID '{request_id}' not found.")),
        Err(error) => dependency_error_response(&error),
    }
}
