//! Ingestion transaction
//!
//! All domain writes for one event (contact, lead, activity, ledger)
//! happen inside a single database transaction. Any failure aborts the
//! whole transaction; partial state is never visible, even across a
//! process crash mid-transaction (SQLite's transactional guarantees are
//! relied upon, not re-implemented).

use crate::db::{activities, leads, ledger};
use crate::ingest::resolver::{resolve_or_create_contact, ContactHint};
use homeflow_common::events::{self, WebsiteEvent};
use homeflow_common::time::now;
use homeflow_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

/// Activity type written for a lead submission
pub const ACTIVITY_LEAD_SUBMITTED: &str = "lead_submitted";
/// Activity type written for a valuation request
pub const ACTIVITY_VALUATION_REQUESTED: &str = "valuation_requested";

/// Outcome of ingesting one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Side effects were applied in this call
    Ingested {
        contact_id: Option<Uuid>,
        lead_id: Uuid,
        activity_id: Uuid,
        ingested_event_id: Uuid,
    },
    /// The ledger already held this event; nothing was written
    Duplicate { ingested_event_id: Uuid },
}

/// Ingest one event, exactly once per distinct event key.
///
/// **Algorithm:**
/// 1. Open a transaction; look up the ledger by `(tenant_id, event_key)`.
///    A hit short-circuits as [`IngestOutcome::Duplicate`] with no writes.
/// 2. Dispatch on the event type (exhaustive match) and write the domain
///    records.
/// 3. Insert the ledger row and commit.
pub async fn ingest(pool: &SqlitePool, event: &WebsiteEvent) -> Result<IngestOutcome> {
    let event_key = events::fingerprint(event)?;
    let payload_json = serde_json::to_string(event)
        .map_err(|e| Error::Internal(format!("Failed to serialize event: {}", e)))?;
    let tenant_id = event.tenant_id().to_string();
    let occurred_at = event.occurred_at();
    let ts = now();

    let mut tx = pool.begin().await?;

    // Processing-time dedup, independent of the queue table: even if two
    // queue jobs carry the same event, effects happen at most once
    if let Some(ingested_event_id) = ledger::find(&mut tx, &tenant_id, &event_key).await? {
        tx.commit().await?;
        debug!(%tenant_id, %event_key, "Event already in ledger, skipping");
        return Ok(IngestOutcome::Duplicate { ingested_event_id });
    }

    let (contact_id, lead_id, activity_id) = match event {
        WebsiteEvent::LeadSubmitted { payload, .. } => {
            let hint = ContactHint::from_lead_payload(payload);
            let contact_id = resolve_or_create_contact(&mut tx, &tenant_id, &hint, ts).await?;

            let lead_id =
                leads::insert_website_lead(&mut tx, &tenant_id, contact_id, payload, ts).await?;

            let summary = match payload.full_name.as_deref() {
                Some(name) if !name.trim().is_empty() => {
                    format!("Website lead submitted by {}", name.trim())
                }
                _ => "Website lead submitted".to_string(),
            };
            let activity_id = activities::insert(
                &mut tx,
                &tenant_id,
                lead_id,
                contact_id,
                ACTIVITY_LEAD_SUBMITTED,
                &summary,
                occurred_at,
                &payload_json,
                ts,
            )
            .await?;

            (contact_id, lead_id, activity_id)
        }
        WebsiteEvent::ValuationRequested { payload, .. } => {
            // Valuation requests carry property data, not contact
            // identity: no contact resolution
            let lead_id = leads::insert_valuation_lead(&mut tx, &tenant_id, payload, ts).await?;

            let summary = format!("Valuation requested for {}", payload.property_address);
            let activity_id = activities::insert(
                &mut tx,
                &tenant_id,
                lead_id,
                None,
                ACTIVITY_VALUATION_REQUESTED,
                &summary,
                occurred_at,
                &payload_json,
                ts,
            )
            .await?;

            (None, lead_id, activity_id)
        }
    };

    let ingested_event_id = ledger::insert(
        &mut tx,
        &tenant_id,
        event.event_type(),
        &event_key,
        occurred_at,
        &payload_json,
        ts,
    )
    .await?;

    tx.commit().await?;

    info!(
        %tenant_id,
        event_type = event.event_type(),
        %event_key,
        lead_id = %lead_id,
        "Ingested website event"
    );

    Ok(IngestOutcome::Ingested {
        contact_id,
        lead_id,
        activity_id,
        ingested_event_id,
    })
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

    fn lead_event() -> WebsiteEvent {
        serde_json::from_str(
            r#"{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": {
                    "fullName": "Jane Doe",
                    "email": "jane@x.com",
                    "listingAddress": "12 Elm St",
                    "source": "listing_page"
                }
            }"#,
        )
        .unwrap()
    }

    fn valuation_event() -> WebsiteEvent {
        serde_json::from_str(
            r#"{
                "eventType": "website.valuation.requested",
                "occurredAt": "2026-03-01T11:00:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": {
                    "propertyAddress": "3 Oak Ave",
                    "propertyType": "semi-detached",
                    "bedrooms": 3
                }
            }"#,
        )
        .unwrap()
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_lead_event_writes_all_records() {
        let pool = setup_test_db().await;

        let outcome = ingest(&pool, &lead_event()).await.unwrap();
        match outcome {
            IngestOutcome::Ingested { contact_id, lead_id, .. } => {
                assert!(contact_id.is_some());

                let (status, lead_type): (String, String) =
                    sqlx::query_as("SELECT status, lead_type FROM leads WHERE id = ?")
                        .bind(lead_id.to_string())
                        .fetch_one(&pool)
                        .await
                        .unwrap();
                assert_eq!(status, "new");
                assert_eq!(lead_type, "website_lead");
            }
            other => panic!("Expected Ingested, got {:?}", other),
        }

        assert_eq!(count(&pool, "contacts").await, 1);
        assert_eq!(count(&pool, "leads").await, 1);
        assert_eq!(count(&pool, "activities").await, 1);
        assert_eq!(count(&pool, "ingested_events").await, 1);

        let activity_type: String =
            sqlx::query_scalar("SELECT activity_type FROM activities")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(activity_type, ACTIVITY_LEAD_SUBMITTED);
    }

    #[tokio::test]
    async fn test_second_ingest_is_duplicate_with_no_writes() {
        let pool = setup_test_db().await;

        let first = ingest(&pool, &lead_event()).await.unwrap();
        let first_ledger_id = match first {
            IngestOutcome::Ingested { ingested_event_id, .. } => ingested_event_id,
            other => panic!("Expected Ingested, got {:?}", other),
        };

        let second = ingest(&pool, &lead_event()).await.unwrap();
        assert_eq!(
            second,
            IngestOutcome::Duplicate { ingested_event_id: first_ledger_id }
        );

        assert_eq!(count(&pool, "contacts").await, 1);
        assert_eq!(count(&pool, "leads").await, 1);
        assert_eq!(count(&pool, "activities").await, 1);
        assert_eq!(count(&pool, "ingested_events").await, 1);
    }

    #[tokio::test]
    async fn test_valuation_event_skips_contact_resolution() {
        let pool = setup_test_db().await;

        let outcome = ingest(&pool, &valuation_event()).await.unwrap();
        match outcome {
            IngestOutcome::Ingested { contact_id, lead_id, .. } => {
                assert_eq!(contact_id, None);

                let (lead_type, property_address): (String, String) = sqlx::query_as(
                    "SELECT lead_type, property_address FROM leads WHERE id = ?",
                )
                .bind(lead_id.to_string())
                .fetch_one(&pool)
                .await
                .unwrap();
                assert_eq!(lead_type, "valuation_request");
                assert_eq!(property_address, "3 Oak Ave");
            }
            other => panic!("Expected Ingested, got {:?}", other),
        }

        assert_eq!(count(&pool, "contacts").await, 0);

        let activity_type: String =
            sqlx::query_scalar("SELECT activity_type FROM activities")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(activity_type, ACTIVITY_VALUATION_REQUESTED);
    }

    #[tokio::test]
    async fn test_anonymous_lead_has_no_contact() {
        let pool = setup_test_db().await;

        let event: WebsiteEvent = serde_json::from_str(
            r#"{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": { "message": "interested in 12 Elm St" }
            }"#,
        )
        .unwrap();

        let outcome = ingest(&pool, &event).await.unwrap();
        match outcome {
            IngestOutcome::Ingested { contact_id, .. } => assert_eq!(contact_id, None),
            other => panic!("Expected Ingested, got {:?}", other),
        }

        assert_eq!(count(&pool, "contacts").await, 0);
        assert_eq!(count(&pool, "leads").await, 1);
    }

    #[tokio::test]
    async fn test_failed_ingest_leaves_no_partial_state() {
        let pool = setup_test_db().await;

        // Break the activities table so the transaction fails after the
        // contact and lead inserts
        sqlx::query("DROP TABLE activities").execute(&pool).await.unwrap();

        let result = ingest(&pool, &lead_event()).await;
        assert!(result.is_err());

        // The aborted transaction must not leave the contact or lead behind
        assert_eq!(count(&pool, "contacts").await, 0);
        assert_eq!(count(&pool, "leads").await, 0);
        assert_eq!(count(&pool, "ingested_events").await, 0);
    }
}
