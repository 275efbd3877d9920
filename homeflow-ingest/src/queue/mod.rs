//! Durable ingestion queue
//!
//! Polling batch processor over the `ingestion_queue` table: events are
//! enqueued with content-based dedup, picked up oldest-first when due,
//! retried with a fixed backoff schedule, and dead-lettered when the
//! retry budget is exhausted or the payload cannot be parsed.

pub mod backoff;
pub mod dead_letter;
pub mod enqueue;
pub mod worker;

pub use backoff::{backoff_delay, MAX_QUEUE_ATTEMPTS};
pub use dead_letter::{list_dead_letter, requeue_bulk, requeue_one, BulkRequeueOutcome};
pub use enqueue::{enqueue, EnqueueOutcome};
pub use worker::{process_batch, BatchOutcome};
