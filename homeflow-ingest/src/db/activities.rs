//! Activity database operations
//!
//! Activities are the immutable audit timeline: one entry per ingested
//! event, written in the same transaction as its lead. Insert-only.

use chrono::{DateTime, Utc};
use homeflow_common::Result;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Insert a timeline activity, returning its id
#[allow(clippy::too_many_arguments)]
pub async fn insert(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    lead_id: Uuid,
    contact_id: Option<Uuid>,
    activity_type: &str,
    summary: &str,
    occurred_at: DateTime<Utc>,
    payload_json: &str,
    now: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO activities
            (id, tenant_id, lead_id, contact_id, activity_type, summary,
             occurred_at, payload_json, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(tenant_id)
    .bind(lead_id.to_string())
    .bind(contact_id.map(|c| c.to_string()))
    .bind(activity_type)
    .bind(summary)
    .bind(occurred_at.to_rfc3339())
    .bind(payload_json)
    .bind(now.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(id)
}
