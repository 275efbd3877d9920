//! Content-addressed event fingerprinting
//!
//! Two events are the same logical event iff their fingerprints match. The
//! fingerprint anchors the uniqueness constraints at both the queue layer
//! (enqueue-time dedup) and the ledger layer (processing-time dedup).

use super::WebsiteEvent;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Compute the idempotency key for an event.
///
/// **Algorithm:**
/// 1. Serialize the event envelope (`eventType`, `occurredAt`, `tenant`,
///    `payload`) to a JSON value.
/// 2. Render it canonically: object keys in sorted order at every level,
///    no insignificant whitespace.
/// 3. SHA-256 the canonical bytes, hex-encode.
///
/// The hash covers `occurredAt`, so producers must replay the original
/// event verbatim when retrying; regenerating the timestamp produces a
/// new logical event and defeats deduplication.
pub fn fingerprint(event: &WebsiteEvent) -> Result<String> {
    let value = serde_json::to_value(event)
        .map_err(|e| Error::Internal(format!("Failed to serialize event: {}", e)))?;

    let mut canonical = String::new();
    write_canonical(&value, &mut canonical);

    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

/// Render a JSON value with object keys sorted at every nesting level.
///
/// Sorting is done explicitly rather than relying on the map type behind
/// `serde_json::Value`, so the canonical form cannot change if a feature
/// flag elsewhere in the build switches that map to insertion order.
fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Key is a JSON string; reuse serde_json's escaping
                out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars already have a single canonical rendering
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_from(json: &str) -> WebsiteEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let event = event_from(
            r#"{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": { "email": "jane@x.com" }
            }"#,
        );

        let key = fingerprint(&event).unwrap();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identical_events_share_fingerprint() {
        let a = event_from(
            r#"{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": { "email": "jane@x.com", "fullName": "Jane" }
            }"#,
        );
        // Same event, different field order in the source JSON
        let b = event_from(
            r#"{
                "payload": { "fullName": "Jane", "email": "jane@x.com" },
                "tenant": { "tenantId": "t1" },
                "occurredAt": "2026-03-01T10:15:00Z",
                "eventType": "website.lead.submitted"
            }"#,
        );

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_occurred_at_changes_fingerprint() {
        let a = event_from(
            r#"{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": { "email": "jane@x.com" }
            }"#,
        );
        let b = event_from(
            r#"{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:01Z",
                "tenant": { "tenantId": "t1" },
                "payload": { "email": "jane@x.com" }
            }"#,
        );

        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_payload_changes_fingerprint() {
        let a = event_from(
            r#"{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": { "email": "jane@x.com" }
            }"#,
        );
        let b = event_from(
            r#"{
                "eventType": "website.lead.submitted",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": { "email": "john@x.com" }
            }"#,
        );

        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_tenant_changes_fingerprint() {
        let a = event_from(
            r#"{
                "eventType": "website.valuation.requested",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t1" },
                "payload": { "propertyAddress": "3 Oak Ave" }
            }"#,
        );
        let b = event_from(
            r#"{
                "eventType": "website.valuation.requested",
                "occurredAt": "2026-03-01T10:15:00Z",
                "tenant": { "tenantId": "t2" },
                "payload": { "propertyAddress": "3 Oak Ave" }
            }"#,
        );

        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }
}
