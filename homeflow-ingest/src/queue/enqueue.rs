//! Enqueue gateway
//!
//! Accepts an inbound event and inserts a queue job unless an identical
//! event (same tenant, same fingerprint) is already queued. Idempotent:
//! producers can safely retry their HTTP call.

use crate::db::queue;
use homeflow_common::db::models::{JobStatus, QueueJob};
use homeflow_common::events::{self, WebsiteEvent};
use homeflow_common::time::now;
use homeflow_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of an enqueue call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// True when an identical event was already queued; `job_id` then
    /// refers to the existing job and no new row was created
    pub duplicate: bool,
    pub job_id: Uuid,
}

/// Enqueue one event for ingestion.
///
/// Dedup runs on `(tenant_id, event_key)`. Losing an insert race to a
/// concurrent enqueue of the same event is handled by re-reading and
/// reporting the winner's job as a duplicate.
pub async fn enqueue(pool: &SqlitePool, event: &WebsiteEvent) -> Result<EnqueueOutcome> {
    let event_key = events::fingerprint(event)?;
    let tenant_id = event.tenant_id();

    if let Some(existing) = queue::find_by_event_key(pool, tenant_id, &event_key).await? {
        debug!(tenant_id, %event_key, job_id = %existing.id, "Event already queued");
        return Ok(EnqueueOutcome { duplicate: true, job_id: existing.id });
    }

    let payload_json = serde_json::to_string(event)
        .map_err(|e| Error::Internal(format!("Failed to serialize event: {}", e)))?;
    let ts = now();

    let job = QueueJob {
        id: Uuid::new_v4(),
        tenant_id: tenant_id.to_string(),
        event_type: event.event_type().to_string(),
        event_key: event_key.clone(),
        occurred_at: event.occurred_at(),
        payload_json,
        status: JobStatus::Pending,
        attempt_count: 0,
        last_error: None,
        next_attempt_at: ts,
        processed_at: None,
        dead_lettered_at: None,
        created_at: ts,
        updated_at: ts,
    };

    match queue::insert(pool, &job).await {
        Ok(()) => {
            info!(tenant_id, event_type = %job.event_type, job_id = %job.id, "Enqueued website event");
            Ok(EnqueueOutcome { duplicate: false, job_id: job.id })
        }
        Err(Error::Database(sqlx::Error::Database(db_err)))
            if db_err.is_unique_violation() =>
        {
            // A concurrent enqueue of the same event won the insert race
            let existing = queue::find_by_event_key(pool, tenant_id, &event_key)
                .await?
                .ok_or_else(|| {
                    Error::Internal("Queue job vanished after unique violation".to_string())
                })?;
            debug!(tenant_id, %event_key, job_id = %existing.id, "Lost enqueue race, reporting duplicate");
            Ok(EnqueueOutcome { duplicate: true, job_id: existing.id })
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        homeflow_common::db::init::create_schema(&pool).await.unwrap();
        pool
    }

    fn lead_event(tenant: &str) -> WebsiteEvent {
        serde_json::from_str(&format!(
            r#"{{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": {{ "tenantId": "{}" }},
                "payload": {{ "email": "jane@x.com" }}
            }}"#,
            tenant
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_creates_pending_job() {
        let pool = setup_test_db().await;

        let outcome = enqueue(&pool, &lead_event("t1")).await.unwrap();
        assert!(!outcome.duplicate);

        let job = queue::fetch(&pool, outcome.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt_count, 0);
        assert_eq!(job.event_type, "website.lead.submitted");
        assert!(job.next_attempt_at <= homeflow_common::time::now());
    }

    #[tokio::test]
    async fn test_enqueue_same_event_twice_is_duplicate() {
        let pool = setup_test_db().await;

        let first = enqueue(&pool, &lead_event("t1")).await.unwrap();
        let second = enqueue(&pool, &lead_event("t1")).await.unwrap();

        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(first.job_id, second.job_id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingestion_queue")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_same_event_different_tenants_both_enqueue() {
        let pool = setup_test_db().await;

        let a = enqueue(&pool, &lead_event("t1")).await.unwrap();
        let b = enqueue(&pool, &lead_event("t2")).await.unwrap();

        assert!(!a.duplicate);
        assert!(!b.duplicate);
        assert_ne!(a.job_id, b.job_id);
    }
}
