//! Contact identity resolution
//!
//! Finds or creates a tenant-scoped contact for an inbound lead. Matching
//! on normalized email first, then normalized phone, avoids split
//! identities across repeat site visits; the fill-if-empty merge policy
//! never clobbers agent-entered data with lower-quality website-supplied
//! values.

use crate::db::contacts::{self, ContactFields};
use crate::ingest::normalize::{normalize_email, normalize_phone};
use chrono::{DateTime, Utc};
use homeflow_common::events::LeadSubmittedPayload;
use homeflow_common::Result;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

/// Contact identity hint extracted from an event payload
#[derive(Debug, Clone, Default)]
pub struct ContactHint {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
}

impl ContactHint {
    pub fn from_lead_payload(payload: &LeadSubmittedPayload) -> Self {
        Self {
            full_name: payload.full_name.clone(),
            email: payload.email.clone(),
            phone: payload.phone.clone(),
            source: payload.source.clone(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Find or create the contact for a hint within one tenant.
///
/// Runs on the ingestion transaction's connection so contact writes commit
/// or roll back with the rest of the event's effects.
///
/// - Lookup order: exact `(tenant_id, email_normalized)` match first,
///   then `(tenant_id, phone_normalized)`.
/// - On match: fill-if-empty merge, `updated_at` bumped regardless.
/// - No usable email or phone → `Ok(None)`: the lead stays anonymous,
///   which is a valid outcome, not an error.
pub async fn resolve_or_create_contact(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    hint: &ContactHint,
    now: DateTime<Utc>,
) -> Result<Option<Uuid>> {
    let email_normalized = hint.email.as_deref().and_then(normalize_email);
    let phone_normalized = hint.phone.as_deref().and_then(normalize_phone);

    if email_normalized.is_none() && phone_normalized.is_none() {
        debug!(tenant_id, "No contact identity in hint, leaving lead anonymous");
        return Ok(None);
    }

    let fields = ContactFields {
        full_name: non_blank(&hint.full_name),
        email: non_blank(&hint.email),
        email_normalized: email_normalized.clone(),
        phone: non_blank(&hint.phone),
        phone_normalized: phone_normalized.clone(),
        source: non_blank(&hint.source),
    };

    let mut existing = None;
    if let Some(email) = &email_normalized {
        existing = contacts::find_by_normalized_email(conn, tenant_id, email).await?;
    }
    if existing.is_none() {
        if let Some(phone) = &phone_normalized {
            existing = contacts::find_by_normalized_phone(conn, tenant_id, phone).await?;
        }
    }

    match existing {
        Some(contact) => {
            contacts::merge_missing_fields(conn, contact.id, &fields, now).await?;
            debug!(tenant_id, contact_id = %contact.id, "Merged hint into existing contact");
            Ok(Some(contact.id))
        }
        None => {
            let id = contacts::insert(conn, tenant_id, &fields, now).await?;
            debug!(tenant_id, contact_id = %id, "Created new contact");
            Ok(Some(id))
        }
    }
}
