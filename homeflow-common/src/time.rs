//! Timestamp utilities
//!
//! All persisted timestamps are bound from Rust as RFC 3339 UTC strings so
//! lexicographic comparison in SQL matches chronological order.

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an RFC 3339 timestamp stored in the database back into UTC
pub fn parse_rfc3339(raw: &str) -> crate::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::Error::Internal(format!("Invalid timestamp in database: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_rfc3339_round_trip() {
        let timestamp = now();
        let parsed = parse_rfc3339(&timestamp.to_rfc3339()).unwrap();
        assert_eq!(parsed, timestamp);
    }

    #[test]
    fn test_parse_rfc3339_rejects_garbage() {
        assert!(parse_rfc3339("not a timestamp").is_err());
    }

    #[test]
    fn test_rfc3339_ordering_is_lexicographic() {
        // The queue store relies on string comparison of stored timestamps.
        let earlier = now();
        let later = earlier + chrono::Duration::seconds(30);
        assert!(earlier.to_rfc3339() < later.to_rfc3339());
    }
}
