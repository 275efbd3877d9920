//! Website event types
//!
//! Inbound events from public tenant websites, discriminated by the
//! `eventType` wire field. The enum is matched exhaustively at the
//! ingestion dispatch point so adding a new event type is a
//! compile-time-checked change.

mod fingerprint;

pub use fingerprint::fingerprint;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wire name of the lead submission event
pub const EVENT_LEAD_SUBMITTED: &str = "website.lead.submitted";
/// Wire name of the valuation request event
pub const EVENT_VALUATION_REQUESTED: &str = "website.valuation.requested";

/// Tenant descriptor carried by every website event
///
/// Tenant resolution (hostname → tenant) happens upstream; by the time an
/// event reaches this service the tenant id is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRef {
    pub tenant_id: String,
}

/// Payload of a `website.lead.submitted` event
///
/// Everything is optional: public website forms cannot be trusted to fill
/// any particular field, and a lead with no usable contact identity is
/// still a valid (anonymous) lead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmittedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Address of the listing the enquiry is about, as shown on the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_address: Option<String>,
    /// Tenant-side listing reference (MLS number or internal ref)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Payload of a `website.valuation.requested` event
///
/// Valuation requests describe a property, not a person; contact identity
/// is not resolved for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequestedPayload {
    pub property_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Inbound website event, tagged by `eventType`
///
/// Immutable once received. Producers must replay an event verbatim on
/// retry: `occurredAt` participates in the fingerprint (see
/// [`fingerprint`]), so a regenerated timestamp defeats deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum WebsiteEvent {
    #[serde(rename = "website.lead.submitted", rename_all = "camelCase")]
    LeadSubmitted {
        occurred_at: DateTime<Utc>,
        tenant: TenantRef,
        payload: LeadSubmittedPayload,
    },
    #[serde(rename = "website.valuation.requested", rename_all = "camelCase")]
    ValuationRequested {
        occurred_at: DateTime<Utc>,
        tenant: TenantRef,
        payload: ValuationRequestedPayload,
    },
}

impl WebsiteEvent {
    /// Wire name of this event's type
    pub fn event_type(&self) -> &'static str {
        match self {
            WebsiteEvent::LeadSubmitted { .. } => EVENT_LEAD_SUBMITTED,
            WebsiteEvent::ValuationRequested { .. } => EVENT_VALUATION_REQUESTED,
        }
    }

    /// Tenant the event belongs to
    pub fn tenant_id(&self) -> &str {
        match self {
            WebsiteEvent::LeadSubmitted { tenant, .. } => &tenant.tenant_id,
            WebsiteEvent::ValuationRequested { tenant, .. } => &tenant.tenant_id,
        }
    }

    /// Producer-supplied event timestamp
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WebsiteEvent::LeadSubmitted { occurred_at, .. } => *occurred_at,
            WebsiteEvent::ValuationRequested { occurred_at, .. } => *occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead_json() -> &'static str {
        r#"{
            "eventType": "website.lead.submitted",
            "occurredAt": "2026-03-01T10:15:00Z",
            "tenant": { "tenantId": "acme-realty" },
            "payload": {
                "fullName": "Jane Doe",
                "email": "jane@example.com",
                "listingAddress": "12 Elm St",
                "source": "listing_page"
            }
        }"#
    }

    #[test]
    fn test_parse_lead_submitted() {
        let event: WebsiteEvent = serde_json::from_str(lead_json()).unwrap();
        assert_eq!(event.event_type(), EVENT_LEAD_SUBMITTED);
        assert_eq!(event.tenant_id(), "acme-realty");

        match event {
            WebsiteEvent::LeadSubmitted { payload, .. } => {
                assert_eq!(payload.full_name.as_deref(), Some("Jane Doe"));
                assert_eq!(payload.email.as_deref(), Some("jane@example.com"));
                assert_eq!(payload.phone, None);
            }
            _ => panic!("Expected LeadSubmitted"),
        }
    }

    #[test]
    fn test_parse_valuation_requested() {
        let json = r#"{
            "eventType": "website.valuation.requested",
            "occurredAt": "2026-03-01T11:00:00Z",
            "tenant": { "tenantId": "acme-realty" },
            "payload": {
                "propertyAddress": "3 Oak Ave",
                "propertyType": "semi-detached",
                "bedrooms": 3
            }
        }"#;

        let event: WebsiteEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type(), EVENT_VALUATION_REQUESTED);

        match event {
            WebsiteEvent::ValuationRequested { payload, .. } => {
                assert_eq!(payload.property_address, "3 Oak Ave");
                assert_eq!(payload.bedrooms, Some(3));
                assert_eq!(payload.estimated_value, None);
            }
            _ => panic!("Expected ValuationRequested"),
        }
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let json = r#"{
            "eventType": "website.newsletter.signup",
            "occurredAt": "2026-03-01T10:15:00Z",
            "tenant": { "tenantId": "acme-realty" },
            "payload": {}
        }"#;

        assert!(serde_json::from_str::<WebsiteEvent>(json).is_err());
    }

    #[test]
    fn test_serialization_round_trip_keeps_tag() {
        let event: WebsiteEvent = serde_json::from_str(lead_json()).unwrap();
        let serialized = serde_json::to_string(&event).unwrap();
        assert!(serialized.contains("\"eventType\""));
        assert!(serialized.contains("website.lead.submitted"));

        let reparsed: WebsiteEvent = serde_json::from_str(&serialized).unwrap();
        assert_eq!(reparsed.event_type(), event.event_type());
        assert_eq!(reparsed.occurred_at(), event.occurred_at());
    }
}
