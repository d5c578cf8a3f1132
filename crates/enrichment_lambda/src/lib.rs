//! AWS-oriented adapters and handlers for the contact-enrichment pipeline.
//!
//! This crate owns runtime integration details (Lambda handlers, queue
//! dispatch, and storage adapters) and exposes a single runtime module
//! boundary for batching, contract, enrichment, and storage key primitives.

pub mod adapters;
pub mod handlers;
pub mod runtime;
