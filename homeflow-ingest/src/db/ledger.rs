//! Idempotency ledger operations
//!
//! One row per successfully-ingested logical event, keyed by
//! `(tenant_id, event_key)`. The ledger is consulted and written inside
//! the ingestion transaction, so side effects happen at most once per
//! logical event even if the queue redelivers it.

use chrono::{DateTime, Utc};
use homeflow_common::Result;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Look up a ledger entry, returning its id if the event was already ingested
pub async fn find(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    event_key: &str,
) -> Result<Option<Uuid>> {
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM ingested_events WHERE tenant_id = ? AND event_key = ?",
    )
    .bind(tenant_id)
    .bind(event_key)
    .fetch_optional(conn)
    .await?;

    match id {
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|e| homeflow_common::Error::Internal(format!("Invalid UUID in database: {}", e))),
        None => Ok(None),
    }
}

/// Insert a ledger entry for a just-ingested event, returning its id
#[allow(clippy::too_many_arguments)]
pub async fn insert(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    event_type: &str,
    event_key: &str,
    occurred_at: DateTime<Utc>,
    payload_json: &str,
    now: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO ingested_events
            (id, tenant_id, event_type, event_key, occurred_at, payload_json,
             processed_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(tenant_id)
    .bind(event_type)
    .bind(event_key)
    .bind(occurred_at.to_rfc3339())
    .bind(payload_json)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(id)
}
