//! Durable queue store
//!
//! Persistence for `ingestion_queue` rows and the status state machine.
//! All status transitions are conditional updates guarded by the current
//! status, so two workers polling the same queue cannot double-apply a
//! transition: the loser of a claim race sees zero affected rows and
//! skips the job.

use chrono::{DateTime, Utc};
use homeflow_common::db::models::{JobStatus, QueueJob};
use homeflow_common::time::parse_rfc3339;
use homeflow_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "id, tenant_id, event_type, event_key, occurred_at, payload_json, \
     status, attempt_count, last_error, next_attempt_at, processed_at, dead_lettered_at, \
     created_at, updated_at";

fn job_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<QueueJob> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))?;

    let status_str: String = row.get("status");
    let occurred_at_str: String = row.get("occurred_at");
    let next_attempt_at_str: String = row.get("next_attempt_at");
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");
    let processed_at_str: Option<String> = row.get("processed_at");
    let dead_lettered_at_str: Option<String> = row.get("dead_lettered_at");

    Ok(QueueJob {
        id,
        tenant_id: row.get("tenant_id"),
        event_type: row.get("event_type"),
        event_key: row.get("event_key"),
        occurred_at: parse_rfc3339(&occurred_at_str)?,
        payload_json: row.get("payload_json"),
        status: JobStatus::from_str(&status_str)?,
        attempt_count: row.get("attempt_count"),
        last_error: row.get("last_error"),
        next_attempt_at: parse_rfc3339(&next_attempt_at_str)?,
        processed_at: processed_at_str.as_deref().map(parse_rfc3339).transpose()?,
        dead_lettered_at: dead_lettered_at_str.as_deref().map(parse_rfc3339).transpose()?,
        created_at: parse_rfc3339(&created_at_str)?,
        updated_at: parse_rfc3339(&updated_at_str)?,
    })
}

/// Insert a new queue job
pub async fn insert(pool: &SqlitePool, job: &QueueJob) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ingestion_queue
            (id, tenant_id, event_type, event_key, occurred_at, payload_json,
             status, attempt_count, last_error, next_attempt_at,
             processed_at, dead_lettered_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(job.id.to_string())
    .bind(&job.tenant_id)
    .bind(&job.event_type)
    .bind(&job.event_key)
    .bind(job.occurred_at.to_rfc3339())
    .bind(&job.payload_json)
    .bind(job.status.as_str())
    .bind(job.attempt_count)
    .bind(&job.last_error)
    .bind(job.next_attempt_at.to_rfc3339())
    .bind(job.processed_at.map(|t| t.to_rfc3339()))
    .bind(job.dead_lettered_at.map(|t| t.to_rfc3339()))
    .bind(job.created_at.to_rfc3339())
    .bind(job.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a job by id
pub async fn fetch(pool: &SqlitePool, id: Uuid) -> Result<Option<QueueJob>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM ingestion_queue WHERE id = ?",
        SELECT_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// Look up a job by its enqueue-time dedup key
pub async fn find_by_event_key(
    pool: &SqlitePool,
    tenant_id: &str,
    event_key: &str,
) -> Result<Option<QueueJob>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM ingestion_queue WHERE tenant_id = ? AND event_key = ?",
        SELECT_COLUMNS
    ))
    .bind(tenant_id)
    .bind(event_key)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// Ids of due jobs, oldest first
///
/// A job is due when `status = 'pending'` and `next_attempt_at` has
/// passed. Ordering by `created_at` gives oldest-first fairness within a
/// tenant; no ordering is guaranteed across concurrent worker
/// invocations.
pub async fn due_job_ids(pool: &SqlitePool, now: DateTime<Utc>, limit: i64) -> Result<Vec<Uuid>> {
    let rows = sqlx::query(
        r#"
        SELECT id FROM ingestion_queue
        WHERE status = 'pending' AND next_attempt_at <= ?
        ORDER BY created_at ASC
        LIMIT ?
        "#,
    )
    .bind(now.to_rfc3339())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let raw: String = row.get("id");
            Uuid::parse_str(&raw)
                .map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))
        })
        .collect()
}

/// Atomically claim a pending job for processing
///
/// Conditional update: transitions `pending → processing` and increments
/// `attempt_count` in one statement. Returns false if the job was not in
/// `pending` anymore (another worker claimed it, or it was requeued or
/// dead-lettered between selection and claim).
pub async fn claim(pool: &SqlitePool, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE ingestion_queue
        SET status = 'processing',
            attempt_count = attempt_count + 1,
            updated_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark a claimed job successfully processed (terminal)
pub async fn mark_processed(pool: &SqlitePool, id: Uuid, now: DateTime<Utc>) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE ingestion_queue
        SET status = 'processed',
            processed_at = ?,
            last_error = NULL,
            updated_at = ?
        WHERE id = ? AND status = 'processing'
        "#,
    )
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Re-arm a claimed job for a later attempt after a recoverable failure
pub async fn mark_retry(
    pool: &SqlitePool,
    id: Uuid,
    next_attempt_at: DateTime<Utc>,
    last_error: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE ingestion_queue
        SET status = 'pending',
            next_attempt_at = ?,
            last_error = ?,
            updated_at = ?
        WHERE id = ? AND status = 'processing'
        "#,
    )
    .bind(next_attempt_at.to_rfc3339())
    .bind(last_error)
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Dead-letter a claimed job (attempts exhausted or payload unparseable)
pub async fn mark_dead_letter(
    pool: &SqlitePool,
    id: Uuid,
    last_error: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE ingestion_queue
        SET status = 'dead_letter',
            dead_lettered_at = ?,
            last_error = ?,
            updated_at = ?
        WHERE id = ? AND status = 'processing'
        "#,
    )
    .bind(now.to_rfc3339())
    .bind(last_error)
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Return long-`processing` jobs to `pending`
///
/// Recovery path for a worker that crashed between claiming a job and
/// recording its outcome. The attempt the crashed worker consumed stays
/// consumed; only the status is released. Returns the number of jobs
/// released.
pub async fn release_stale(
    pool: &SqlitePool,
    stuck_since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE ingestion_queue
        SET status = 'pending',
            next_attempt_at = ?,
            updated_at = ?
        WHERE status = 'processing' AND updated_at <= ?
        "#,
    )
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(stuck_since.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Page of dead-lettered jobs, most recently dead-lettered first
pub async fn list_dead_letter(
    pool: &SqlitePool,
    tenant_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<QueueJob>> {
    let rows = match tenant_id {
        Some(tenant) => {
            sqlx::query(&format!(
                "SELECT {} FROM ingestion_queue \
                 WHERE status = 'dead_letter' AND tenant_id = ? \
                 ORDER BY dead_lettered_at DESC LIMIT ? OFFSET ?",
                SELECT_COLUMNS
            ))
            .bind(tenant)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "SELECT {} FROM ingestion_queue \
                 WHERE status = 'dead_letter' \
                 ORDER BY dead_lettered_at DESC LIMIT ? OFFSET ?",
                SELECT_COLUMNS
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(job_from_row).collect()
}

/// Reset one dead-lettered job to pending
///
/// Conditional on the job still being `dead_letter`; returns false if it
/// is in any other state (including "already requeued"). Resets the
/// retry budget and makes the job immediately eligible.
pub async fn requeue_if_dead_letter(
    pool: &SqlitePool,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE ingestion_queue
        SET status = 'pending',
            attempt_count = 0,
            last_error = NULL,
            dead_lettered_at = NULL,
            next_attempt_at = ?,
            updated_at = ?
        WHERE id = ? AND status = 'dead_letter'
        "#,
    )
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Reset a batch of dead-lettered jobs to pending in one statement
///
/// Constrained to rows still in `dead_letter`, so a job that changed
/// state between selection and update is simply not counted. Returns how
/// many rows actually transitioned.
pub async fn requeue_many_if_dead_letter(
    pool: &SqlitePool,
    ids: &[Uuid],
    now: DateTime<Utc>,
) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "UPDATE ingestion_queue \
         SET status = 'pending', attempt_count = 0, last_error = NULL, \
             dead_lettered_at = NULL, next_attempt_at = ?, updated_at = ? \
         WHERE status = 'dead_letter' AND id IN ({})",
        placeholders
    );

    let mut query = sqlx::query(&sql).bind(now.to_rfc3339()).bind(now.to_rfc3339());
    for id in ids {
        query = query.bind(id.to_string());
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}
