use serde_json::{json, Value};
use uuid::Uuid;

use crate::adapters::control_store::ControlStore;
use crate::adapters::queue::BatchQueue;
use crate::handlers::response::{
    dependency_error_response, error_response, normalize_event, success_response,
    validation_error_response, ApiGatewayResponse,
};
use crate::runtime::batching::{batch_count, split_into_batches};
use crate::runtime::contract::{BatchMessage, Record, SubmitAccepted};

pub const SUBMIT_ACCEPTED_MESSAGE: &str = "Contacts successfully split into batches and queued.";

pub fn handle_submit_event(
    event: Value,
    batch_size: usize,
    control_store: &dyn ControlStore,
    queue: &dyn BatchQueue,
) -> ApiGatewayResponse {
    let payload = match normalize_event(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(&message),
    };

    let Some(contacts_value) = payload.get("contacts") else {
        return validation_error_response("Missing 'contacts' in request payload.");
    };
    let contacts: Vec<Record> = match serde_json::from_value(contacts_value.clone()) {
        Ok(value) => value,
        Err(error) => {
            return validation_error_response(&format!("Malformed 'contacts' payload: {error}"));
        }
    };

    let total_batches = match batch_count(contacts.len(), batch_size) {
        Ok(value) => value,
        Err(error) => {
            return error_response(
                500,
                json!({
                    "error": "misconfiguration",
                    "message": error.message(),
                }),
            );
        }
    };

    let request_id = Uuid::new_v4().to_string();

    // The control record must exist before any batch message becomes visible
    // to workers; a worker finishing first would otherwise observe a missing
    // record. An empty submission still gets a control record with
    // expected_batches = 0, which is immediately completed.
    if let Err(error) = control_store.initialize_request(&request_id, total_batches) {
        return dependency_error_response(&error);
    }

    let batches = match split_into_batches(&contacts, batch_size) {
        Ok(value) => value,
        Err(error) => {
            return error_response(
                500,
                json!({
                    "error": "misconfiguration",
                    "message": error.message(),
                }),
            );
        }
    };

    for (index, chunk) in batches.enumerate() {
        let message = BatchMessage {
            request_id: request_id.clone(),
            batch_id: index + 1,
            batch: chunk.to_vec(),
        };

        let bytes = match serde_json::to_vec(&message) {
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

        if let Err(error) = queue.send_message(&bytes) {
            return error_response(
                500,
                json!({
                    "error": "dispatch_failed",
                    "message": error,
                    "request_id": request_id,
                }),
            );
        }
    }

    log_submit_info(
        "request_accepted",
        json!({
            "request_id": request_id.clone(),
            "contacts": contacts.len(),
            "total_batches": total_batches,
        }),
    );

    success_response(
        200,
        SubmitAccepted {
            message: SUBMIT_ACCEPTED_MESSAGE.to_string(),
            request_id,
            total_batches,
        },
    )
}

fn log_submit_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "submit_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::adapters::control_store::BatchAcknowledgement;
    use crate::runtime::contract::ControlRecord;

    struct RecordingControlStore {
        records: Mutex<HashMap<String, ControlRecord>>,
        operations: Arc<Mutex<Vec<String>>>,
        fail_initialize: bool,
    }

    impl RecordingControlStore {
        fn new(operations: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
                operations,
                fail_initialize: false,
            }
        }

        fn record(&self, request_id: &str) -> Option<ControlRecord> {
            self.records
                .lock()
                .expect("poisoned mutex")
                .get(request_id)
                .cloned()
        }
    }

    impl ControlStore for RecordingControlStore {
        fn initialize_request(
            &self,
            request_id: &str,
            expected_batches: usize,
        ) -> Result<(), String> {
            if self.fail_initialize {
                return Err("simulated control store failure".to_string());
            }
            self.operations
                .lock()
                .expect("poisoned mutex")
                .push("initialize_request".to_string());
            self.records.lock().expect("poisoned mutex").insert(
                request_id.to_string(),
                ControlRecord {
                    request_id: request_id.to_string(),
                    expected_batches,
                    processed_batches: 0,
                },
            );
            Ok(())
        }

        fn fetch_control_record(&self, request_id: &str) -> Result<Option<ControlRecord>, String> {
            Ok(self.record(request_id))
        }

        fn mark_batch_processed(
            &self,
            _request_id: &str,
            _batch_id: usize,
        ) -> Result<BatchAcknowledgement, String> {
            unreachable!("submit never marks batches processed")
        }
    }

    struct CapturingQueue {
        payloads: Mutex<Vec<Vec<u8>>>,
        operations: Arc<Mutex<Vec<String>>>,
        fail_send: bool,
    }

    impl CapturingQueue {
        fn new(operations: Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                payloads: Mutex::new(Vec::new()),
                operations,
                fail_send: false,
            }
        }

        fn messages(&self) -> Vec<BatchMessage> {
            self.payloads
                .lock()
                .expect("poisoned mutex")
                .iter()
                .map(|payload| {
                    serde_json::from_slice(payload).expect("queued payload should parse")
                })
                .collect()
        }
    }

    impl BatchQueue for CapturingQueue {
        fn send_message(&self, payload: &[u8]) -> Result<(), String> {
            if self.fail_send {
                return Err("simulated queue failure".to_string());
            }
            self.operations
                .lock()
                .expect("poisoned mutex")
                .push("send_message".to_string());
            self.payloads
                .lock()
                .expect("poisoned mutex")
                .push(payload.to_vec());
            Ok(())
        }
    }

    fn contacts_event(count: usize) -> Value {
        let contacts: Vec<Value> = (0..count)
            .map(|index| {
                json!({
                    "id": format!("contact-{index}"),
                    "first_name": "John",
                    "last_name": "Doe",
                    "company_domain": "example.com",
                })
            })
            .collect();
        json!({"body": {"contacts": contacts}})
    }

    fn harness() -> (RecordingControlStore, CapturingQueue) {
        let operations = Arc::new(Mutex::new(Vec::new()));
        (
            RecordingControlStore::new(operations.clone()),
            CapturingQueue::new(operations),
        )
    }

    #[test]
    fn splits_queues_and_initializes_control_record() {
        let (control_store, queue) = harness();
        let response = handle_submit_event(contacts_event(2), 100, &control_store, &queue);

        assert_eq!(response.status_code, 200);
        let body: SubmitAccepted =
            serde_json::from_str(&response.body).expect("body should parse");
        assert_eq!(body.message, SUBMIT_ACCEPTED_MESSAGE);
        assert_eq!(body.total_batches, 1);

        let messages = queue.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].request_id, body.request_id);
        assert_eq!(messages[0].batch_id, 1);
        assert_eq!(messages[0].batch.len(), 2);

        let record = control_store
            .record(&body.request_id)
            .expect("control record should exist");
        assert_eq!(record.expected_batches, 1);
        assert_eq!(record.processed_batches, 0);
    }

    #[test]
    fn expected_batches_is_ceiling_of_contact_count() {
        let (control_store, queue) = harness();
        let response = handle_submit_event(contacts_event(250), 100, &control_store, &queue);

        assert_eq!(response.status_code, 200);
        let body: SubmitAccepted =
            serde_json::from_str(&response.body).expect("body should parse");
        assert_eq!(body.total_batches, 3);

        let messages = queue.messages();
        let batch_ids: Vec<usize> = messages.iter().map(|message| message.batch_id).collect();
        assert_eq!(batch_ids, vec![1, 2, 3]);
        let sizes: Vec<usize> = messages.iter().map(|message| message.batch.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn control_record_is_initialized_before_any_dispatch() {
        let operations = Arc::new(Mutex::new(Vec::new()));
        let control_store = RecordingControlStore::new(operations.clone());
        let queue = CapturingQueue::new(operations.clone());

        let response = handle_submit_event(contacts_event(250), 100, &control_store, &queue);
        assert_eq!(response.status_code, 200);

        let observed = operations.lock().expect("poisoned mutex").clone();
        assert_eq!(
            observed,
            vec![
                "initialize_request",
                "send_message",
                "send_message",
                "send_message"
            ]
        );
    }

    #[test]
    fn rejects_payload_without_contacts() {
        let (control_store, queue) = harness();
        let response = handle_submit_event(
            json!({"body": "{\"other\": 1}"}),
            100,
            &control_store,
            &queue,
        );

        assert_eq!(response.status_code, 400);
        assert!(response.body.contains("Missing 'contacts'"));
        assert!(queue.messages().is_empty());
    }

    #[test]
    fn rejects_malformed_contacts() {
        let (control_store, queue) = harness();
        let response = handle_submit_event(
            json!({"contacts": "not-a-list"}),
            100,
            &control_store,
            &queue,
        );

        assert_eq!(response.status_code, 400);
        assert!(response.body.contains("Malformed 'contacts'"));
    }

    #[test]
    fn empty_submission_still_creates_control_record() {
        let (control_store, queue) = harness();
        let response = handle_submit_event(contacts_event(0), 100, &control_store, &queue);

        assert_eq!(response.status_code, 200);
        let body: SubmitAccepted =
            serde_json::from_str(&response.body).expect("body should parse");
        assert_eq!(body.total_batches, 0);
        assert!(queue.messages().is_empty());

        let record = control_store
            .record(&body.request_id)
            .expect("control record should exist");
        assert_eq!(record.expected_batches, 0);
    }

    #[test]
    fn queue_failure_surfaces_as_server_error() {
        let operations = Arc::new(Mutex::new(Vec::new()));
        let control_store = RecordingControlStore::new(operations.clone());
        let mut queue = CapturingQueue::new(operations);
        queue.fail_send = true;

        let response = handle_submit_event(contacts_event(1), 100, &control_store, &queue);
        assert_eq!(response.status_code, 500);
        assert!(response.body.contains("dispatch_failed"));
    }

    #[test]
    fn control_store_failure_prevents_dispatch() {
        let operations = Arc::new(Mutex::new(Vec::new()));
        let mut control_store = RecordingControlStore::new(operations.clone());
        control_store.fail_initialize = true;
        let queue = CapturingQueue::new(operations);

        let response = handle_submit_event(contacts_event(5), 2, &control_store, &queue);
        assert_eq!(response.status_code, 500);
        assert!(queue.messages().is_empty());
    }

    #[test]
    fn zero_batch_size_is_a_misconfiguration() {
        let (control_store, queue) = harness();
        let response = handle_submit_event(contacts_event(5), 0, &control_store, &queue);
        assert_eq!(response.status_code, 500);
        assert!(response.body.contains("misconfiguration"));
    }
}
