use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A contact record is an open JSON object: callers may attach arbitrary
/// fields alongside the ones enrichment requires.
pub type Record = Map<String, Value>;

/// Attribute that keys an enriched record in the persisted store.
pub const RECORD_KEY_FIELD: &str = "id";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentRequest {
    pub contacts: Vec<Record>,
}

/// One queue message: a single batch tagged with its owning request and its
/// 1-based position within that request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchMessage {
    pub request_id: String,
    pub batch_id: usize,
    pub batch: Vec<Record>,
}

/// Per-request completion counters. `processed_batches` only ever moves
/// toward `expected_batches`; completion is derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlRecord {
    pub request_id: String,
    pub expected_batches: usize,
    pub processed_batches: usize,
}

impl ControlRecord {
    pub fn status(&self) -> CompletionStatus {
        if self.processed_batches >= self.expected_batches {
            CompletionStatus::Completed
        } else {
            CompletionStatus::Incomplete
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Completed,
    Incomplete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitAccepted {
    pub message: String,
    pub request_id: String,
    pub total_batches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResponse {
    pub status: CompletionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateResult {
    pub message: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// A record lacked a field the pipeline requires (enrichment inputs or the
/// storage key). Aborts the whole batch when raised by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    field: String,
}

impl MissingField {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Missing required field '{}'", self.field)
    }
}

impl std::error::Error for MissingField {}

/// Returns the record's storage key, the `id` field.
pub fn record_key(record: &Record) -> Result<&str, MissingField> {
    record
        .get(RECORD_KEY_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| MissingField::new(RECORD_KEY_FIELD))
}
