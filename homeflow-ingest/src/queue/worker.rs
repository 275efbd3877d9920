//! Batch worker loop
//!
//! Polling batch processor: invoked periodically by an external
//! scheduler, it drains up to `limit` due jobs sequentially and applies
//! the retry/backoff/dead-letter policy. There is no mid-batch
//! cancellation; a batch runs to completion once started.
//!
//! One job's failure never aborts the batch: ingestion failures are
//! recorded on the job row via the state machine, and infrastructure
//! failures (store unreachable mid-job) are logged and leave the job in
//! `processing` for the stale sweep to reclaim.

use crate::db::{queue, settings};
use crate::ingest::{self, IngestOutcome};
use crate::queue::backoff::{backoff_delay, MAX_QUEUE_ATTEMPTS};
use chrono::Duration;
use homeflow_common::events::WebsiteEvent;
use homeflow_common::time::now;
use homeflow_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Batch size bounds; requested limits are clamped into this range
pub const MIN_BATCH_LIMIT: i64 = 1;
pub const MAX_BATCH_LIMIT: i64 = 200;

/// Error recorded on jobs whose payload does not deserialize
const INVALID_PAYLOAD: &str = "invalid_payload";

/// Counters for one worker invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Jobs claimed by this invocation
    pub picked_count: u64,
    /// Jobs that reached `processed` (including ledger duplicates)
    pub processed_count: u64,
    /// Jobs whose attempt failed (requeued + dead-lettered)
    pub failed_count: u64,
    /// Failed jobs re-armed with backoff
    pub requeued_count: u64,
    /// Failed jobs moved to `dead_letter`
    pub dead_lettered_count: u64,
}

enum JobOutcome {
    /// Another worker claimed the job between selection and claim
    NotClaimed,
    Processed,
    Requeued,
    DeadLettered,
}

/// Process one batch of due jobs.
///
/// **Algorithm:**
/// 1. Release jobs stuck in `processing` longer than the configured
///    timeout (crashed-worker recovery).
/// 2. Select up to `limit` due pending jobs, oldest first.
/// 3. Per job: atomic claim, parse, ingest, record the outcome on the
///    job row (processed / pending-with-backoff / dead_letter).
pub async fn process_batch(pool: &SqlitePool, limit: i64) -> Result<BatchOutcome> {
    let limit = limit.clamp(MIN_BATCH_LIMIT, MAX_BATCH_LIMIT);
    let ts = now();

    let timeout_secs =
        settings::get_i64(pool, "queue_processing_timeout_secs", 600).await?;
    let released = queue::release_stale(pool, ts - Duration::seconds(timeout_secs), ts).await?;
    if released > 0 {
        warn!(released, timeout_secs, "Released jobs stuck in processing");
    }

    let ids = queue::due_job_ids(pool, ts, limit).await?;
    debug!(due = ids.len(), limit, "Selected due jobs");

    let mut outcome = BatchOutcome::default();
    for id in ids {
        match process_one(pool, id).await {
            Ok(JobOutcome::NotClaimed) => {}
            Ok(JobOutcome::Processed) => {
                outcome.picked_count += 1;
                outcome.processed_count += 1;
            }
            Ok(JobOutcome::Requeued) => {
                outcome.picked_count += 1;
                outcome.failed_count += 1;
                outcome.requeued_count += 1;
            }
            Ok(JobOutcome::DeadLettered) => {
                outcome.picked_count += 1;
                outcome.failed_count += 1;
                outcome.dead_lettered_count += 1;
            }
            Err(err) => {
                // Store-level failure mid-job: no outcome was recorded.
                // The job stays in whatever state it reached; a
                // `processing` row is reclaimed by the stale sweep.
                error!(job_id = %id, error = %err, "Job processing aborted by store failure");
            }
        }
    }

    info!(
        picked = outcome.picked_count,
        processed = outcome.processed_count,
        failed = outcome.failed_count,
        requeued = outcome.requeued_count,
        dead_lettered = outcome.dead_lettered_count,
        "Batch complete"
    );

    Ok(outcome)
}

async fn process_one(pool: &SqlitePool, id: Uuid) -> Result<JobOutcome> {
    if !queue::claim(pool, id, now()).await? {
        debug!(job_id = %id, "Job no longer pending, skipping");
        return Ok(JobOutcome::NotClaimed);
    }

    let job = match queue::fetch(pool, id).await? {
        Some(job) => job,
        None => {
            warn!(job_id = %id, "Claimed job disappeared");
            return Ok(JobOutcome::NotClaimed);
        }
    };

    let event: WebsiteEvent = match serde_json::from_str(&job.payload_json) {
        Ok(event) => event,
        Err(parse_err) => {
            // Retrying cannot fix an unparseable payload; dead-letter on
            // first pickup, bypassing the retry budget
            warn!(
                job_id = %id,
                tenant_id = %job.tenant_id,
                error = %parse_err,
                "Unparseable payload, dead-lettering"
            );
            queue::mark_dead_letter(pool, id, INVALID_PAYLOAD, now()).await?;
            return Ok(JobOutcome::DeadLettered);
        }
    };

    match ingest::ingest(pool, &event).await {
        Ok(IngestOutcome::Ingested { lead_id, .. }) => {
            queue::mark_processed(pool, id, now()).await?;
            debug!(job_id = %id, lead_id = %lead_id, "Job processed");
            Ok(JobOutcome::Processed)
        }
        Ok(IngestOutcome::Duplicate { ingested_event_id }) => {
            queue::mark_processed(pool, id, now()).await?;
            debug!(job_id = %id, ingested_event_id = %ingested_event_id, "Job was a ledger duplicate");
            Ok(JobOutcome::Processed)
        }
        Err(err) if err.is_store_unavailable() => {
            // Not an ingestion failure: surface to the batch loop without
            // consuming the job's retry budget
            Err(err)
        }
        Err(err) => {
            let last_error = err.to_string();
            if job.attempt_count >= MAX_QUEUE_ATTEMPTS {
                error!(
                    job_id = %id,
                    tenant_id = %job.tenant_id,
                    attempts = job.attempt_count,
                    error = %last_error,
                    "Retry budget exhausted, dead-lettering"
                );
                queue::mark_dead_letter(pool, id, &last_error, now()).await?;
                Ok(JobOutcome::DeadLettered)
            } else {
                let ts = now();
                let next_attempt_at = ts + backoff_delay(job.attempt_count);
                warn!(
                    job_id = %id,
                    tenant_id = %job.tenant_id,
                    attempt = job.attempt_count,
                    next_attempt_at = %next_attempt_at,
                    error = %last_error,
                    "Ingestion failed, re-arming with backoff"
                );
                queue::mark_retry(pool, id, next_attempt_at, &last_error, ts).await?;
                Ok(JobOutcome::Requeued)
            }
        }
    }
}
