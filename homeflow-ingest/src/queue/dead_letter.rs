//! Dead-letter manager
//!
//! Operational surface over terminally-failed jobs: list them for
//! inspection and flip them back to `pending` for reprocessing,
//! individually or in bulk. Requeueing resets the retry budget.

use crate::db::queue;
use homeflow_common::db::models::QueueJob;
use homeflow_common::time::now;
use homeflow_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

/// Result of a bulk requeue over one page of dead-lettered jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequeueOutcome {
    /// Jobs of the selected page that actually transitioned to pending
    pub requeued_count: u64,
    /// Jobs of the selected page that had changed state between
    /// selection and update
    pub skipped_count: u64,
}

/// Page of dead-lettered jobs, most recently dead-lettered first
pub async fn list_dead_letter(
    pool: &SqlitePool,
    tenant_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<QueueJob>> {
    queue::list_dead_letter(pool, tenant_id, limit.max(1), offset.max(0)).await
}

/// Requeue one dead-lettered job.
///
/// Returns false if the job is missing or not currently dead-lettered.
/// On success the job is pending, its attempt count is reset to 0, and
/// it is immediately eligible for pickup.
pub async fn requeue_one(pool: &SqlitePool, job_id: Uuid) -> Result<bool> {
    let requeued = queue::requeue_if_dead_letter(pool, job_id, now()).await?;
    if requeued {
        info!(job_id = %job_id, "Requeued dead-lettered job");
    }
    Ok(requeued)
}

/// Requeue a page of dead-lettered jobs.
///
/// Selection and update are separate statements; the update is
/// constrained to rows still in `dead_letter`, so jobs that changed
/// state in between are reported as skipped rather than clobbered.
pub async fn requeue_bulk(
    pool: &SqlitePool,
    tenant_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<BulkRequeueOutcome> {
    let page = queue::list_dead_letter(pool, tenant_id, limit.max(1), offset.max(0)).await?;
    let ids: Vec<Uuid> = page.iter().map(|job| job.id).collect();

    let requeued_count = queue::requeue_many_if_dead_letter(pool, &ids, now()).await?;
    let skipped_count = ids.len() as u64 - requeued_count;

    if requeued_count > 0 {
        info!(requeued = requeued_count, skipped = skipped_count, "Bulk requeue complete");
    }

    Ok(BulkRequeueOutcome { requeued_count, skipped_count })
}
