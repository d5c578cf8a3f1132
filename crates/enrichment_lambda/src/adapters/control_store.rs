use crate::runtime::contract::ControlRecord;

/// Outcome of marking one batch processed under at-least-once delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAcknowledgement {
    /// First delivery: the completion counter was incremented.
    Counted,
    /// Redelivery: the batch was already counted; the counter is unchanged.
    AlreadyCounted,
}

pub trait ControlStore {
    fn initialize_request(&self, request_id: &str, expected_batches: usize) -> Result<(), String>;

    fn fetch_control_record(&self, request_id: &str) -> Result<Option<ControlRecord>, String>;

    /// Atomically increments `processed_batches` for `request_id`, at most
    /// once per `batch_id`. A missing control record is an error, not an
    /// acknowledgement.
    fn mark_batch_processed(
        &self,
        request_id: &str,
        batch_id: usize,
    ) -> Result<BatchAcknowledgement, String>;
}
