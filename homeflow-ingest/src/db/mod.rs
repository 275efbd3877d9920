//! Database operations for the ingestion service
//!
//! One module per entity, mirroring the table layout. Functions that must
//! participate in the ingestion transaction take `&mut SqliteConnection`
//! so they run on the transaction's connection; queue bookkeeping runs
//! against the pool directly.

pub mod activities;
pub mod contacts;
pub mod leads;
pub mod ledger;
pub mod queue;
pub mod settings;
