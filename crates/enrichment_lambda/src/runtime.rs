pub use enrichment_core::{batching, contract, enrichment, storage_keys};
