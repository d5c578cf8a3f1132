use crate::runtime::contract::Record;

pub trait EnrichedRecordStore {
    /// Persists enriched records under `(request_id, record id)`.
    fn save_records(&self, request_id: &str, records: &[Record]) -> Result<(), String>;

    /// Returns every enriched record stored for `request_id`.
    fn fetch_records(&self, request_id: &str) -> Result<Vec<Record>, String>;
}
