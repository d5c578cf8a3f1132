use std::time::Instant;

use serde_json::{json, Value};

use crate::adapters::control_store::{BatchAcknowledgement, ControlStore};
use crate::adapters::record_store::EnrichedRecordStore;
use crate::runtime::contract::{record_key, BatchMessage};
use crate::runtime::enrichment::StrategyKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub request_id: String,
    pub batch_id: usize,
    pub records_enriched: usize,
    pub acknowledgement: BatchAcknowledgement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerError {
    pub message: String,
}

/// Processes one delivered batch message: enrich every record, persist the
/// enriched batch, then count the batch toward completion.
///
/// Safe under at-least-once delivery: persistence overwrites the same record
/// keys, and the completion counter moves at most once per batch id. Any
/// failure aborts the whole batch without acknowledging it, so the queue
/// redelivers the entire message.
pub fn handle_batch_message(
    message: &BatchMessage,
    strategy: StrategyKind,
    record_store: &dyn EnrichedRecordStore,
    control_store: &dyn ControlStore,
) -> Result<WorkerReport, WorkerError> {
    let started_at = Instant::now();
    log_worker_info(
        "batch_started",
        json!({
            "request_id": message.request_id.clone(),
            "batch_id": message.batch_id,
            "records": message.batch.len(),
        }),
    );

    match process_batch(message, strategy, record_store, control_store) {
        Ok(report) => {
            log_worker_info(
                "batch_completed",
                json!({
                    "request_id": report.request_id.clone(),
                    "batch_id": report.batch_id,
                    "records_enriched": report.records_enriched,
                    "redelivery": report.acknowledgement == BatchAcknowledgement::AlreadyCounted,
                    "duration_ms": started_at.elapsed().as_millis(),
                }),
            );
            Ok(report)
        }
        Err(error) => {
            log_worker_error(
                "batch_failed",
                json!({
                    "request_id": message.request_id.clone(),
                    "batch_id": message.batch_id,
                    "duration_ms": started_at.elapsed().as_millis(),
                    "error": error.clone(),
                }),
            );
            Err(WorkerError { message: error })
        }
    }
}

fn process_batch(
    message: &BatchMessage,
    strategy: StrategyKind,
    record_store: &dyn EnrichedRecordStore,
    control_store: &dyn ControlStore,
) -> Result<WorkerReport, String> {
    let mut enriched_records = Vec::with_capacity(message.batch.len());
    for record in &message.batch {
        // The storage key must be present before anything is written, so a
        // bad record aborts the batch with no partial persistence.
        record_key(record).map_err(|error| error.to_string())?;
        let enriched = strategy.enrich(record).map_err(|error| error.to_string())?;
        enriched_records.push(enriched);
    }

    record_store.save_records(&message.request_id, &enriched_records)?;

    let acknowledgement =
        control_store.mark_batch_processed(&message.request_id, message.batch_id)?;

    Ok(WorkerReport {
        request_id: message.request_id.clone(),
        batch_id: message.batch_id,
        records_enriched: enriched_records.len(),
        acknowledgement,
    })
}

fn log_worker_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "batch_worker",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_worker_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "batch_worker",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
