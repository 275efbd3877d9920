//! Lead database operations

use chrono::{DateTime, Utc};
use homeflow_common::events::{LeadSubmittedPayload, ValuationRequestedPayload};
use homeflow_common::Result;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Insert a lead for a website lead submission, returning its id
///
/// New leads always start in status `new`.
pub async fn insert_website_lead(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    contact_id: Option<Uuid>,
    payload: &LeadSubmittedPayload,
    now: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO leads
            (id, tenant_id, contact_id, status, lead_type, source, message,
             listing_address, listing_ref, created_at, updated_at)
        VALUES (?, ?, ?, 'new', 'website_lead', ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(tenant_id)
    .bind(contact_id.map(|c| c.to_string()))
    .bind(&payload.source)
    .bind(&payload.message)
    .bind(&payload.listing_address)
    .bind(&payload.listing_ref)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(id)
}

/// Insert a lead for a valuation request, returning its id
///
/// Valuation leads carry property details and never reference a contact.
pub async fn insert_valuation_lead(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    payload: &ValuationRequestedPayload,
    now: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO leads
            (id, tenant_id, contact_id, status, lead_type, source,
             property_address, property_type, bedrooms, estimated_value,
             created_at, updated_at)
        VALUES (?, ?, NULL, 'new', 'valuation_request', ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(tenant_id)
    .bind(&payload.source)
    .bind(&payload.property_address)
    .bind(&payload.property_type)
    .bind(payload.bedrooms)
    .bind(payload.estimated_value)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(id)
}
