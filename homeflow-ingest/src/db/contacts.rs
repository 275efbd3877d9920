//! Contact database operations

use chrono::{DateTime, Utc};
use homeflow_common::Result;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

/// Tenant-scoped contact identity
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: Uuid,
    pub tenant_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub email_normalized: Option<String>,
    pub phone: Option<String>,
    pub phone_normalized: Option<String>,
    pub source: Option<String>,
}

/// Field values for creating or merging a contact
#[derive(Debug, Clone, Default)]
pub struct ContactFields {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub email_normalized: Option<String>,
    pub phone: Option<String>,
    pub phone_normalized: Option<String>,
    pub source: Option<String>,
}

fn contact_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Contact> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| homeflow_common::Error::Internal(format!("Invalid UUID in database: {}", e)))?;

    Ok(Contact {
        id,
        tenant_id: row.get("tenant_id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        email_normalized: row.get("email_normalized"),
        phone: row.get("phone"),
        phone_normalized: row.get("phone_normalized"),
        source: row.get("source"),
    })
}

const SELECT_COLUMNS: &str =
    "id, tenant_id, full_name, email, email_normalized, phone, phone_normalized, source";

/// Look up a contact by normalized email within a tenant
pub async fn find_by_normalized_email(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    email_normalized: &str,
) -> Result<Option<Contact>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM contacts WHERE tenant_id = ? AND email_normalized = ?",
        SELECT_COLUMNS
    ))
    .bind(tenant_id)
    .bind(email_normalized)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(contact_from_row).transpose()
}

/// Look up a contact by normalized phone within a tenant
pub async fn find_by_normalized_phone(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    phone_normalized: &str,
) -> Result<Option<Contact>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM contacts WHERE tenant_id = ? AND phone_normalized = ?",
        SELECT_COLUMNS
    ))
    .bind(tenant_id)
    .bind(phone_normalized)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(contact_from_row).transpose()
}

/// Insert a new contact, returning its id
pub async fn insert(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    fields: &ContactFields,
    now: DateTime<Utc>,
) -> Result<Uuid> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO contacts
            (id, tenant_id, full_name, email, email_normalized, phone, phone_normalized,
             source, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(tenant_id)
    .bind(&fields.full_name)
    .bind(&fields.email)
    .bind(&fields.email_normalized)
    .bind(&fields.phone)
    .bind(&fields.phone_normalized)
    .bind(&fields.source)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(conn)
    .await?;

    Ok(id)
}

/// Merge hint fields into an existing contact: each field is written only
/// if the stored value is NULL or empty. Populated fields are preserved
/// as-is. `updated_at` is bumped regardless.
pub async fn merge_missing_fields(
    conn: &mut SqliteConnection,
    contact_id: Uuid,
    fields: &ContactFields,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE contacts SET
            full_name = COALESCE(NULLIF(full_name, ''), ?),
            email = COALESCE(NULLIF(email, ''), ?),
            email_normalized = COALESCE(NULLIF(email_normalized, ''), ?),
            phone = COALESCE(NULLIF(phone, ''), ?),
            phone_normalized = COALESCE(NULLIF(phone_normalized, ''), ?),
            source = COALESCE(NULLIF(source, ''), ?),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.full_name)
    .bind(&fields.email)
    .bind(&fields.email_normalized)
    .bind(&fields.phone)
    .bind(&fields.phone_normalized)
    .bind(&fields.source)
    .bind(now.to_rfc3339())
    .bind(contact_id.to_string())
    .execute(conn)
    .await?;

    Ok(())
}
