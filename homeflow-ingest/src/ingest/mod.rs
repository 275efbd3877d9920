//! Event ingestion
//!
//! Turns a parsed website event into domain records (contact, lead,
//! activity) plus an idempotency ledger row, atomically.

pub mod normalize;
pub mod resolver;
pub mod transaction;

pub use resolver::{resolve_or_create_contact, ContactHint};
pub use transaction::{ingest, IngestOutcome};
