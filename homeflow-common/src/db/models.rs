//! Shared row models for the ingestion queue

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a durable queue job
///
/// Transitions:
/// - `pending → processing → processed` (success, terminal)
/// - `pending → processing → pending` (recoverable failure, re-armed with backoff)
/// - `pending|processing → dead_letter` (attempts exhausted or payload unparseable)
/// - `dead_letter → pending` only via explicit requeue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Processed,
    DeadLetter,
}

impl JobStatus {
    /// Database representation of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Processed => "processed",
            JobStatus::DeadLetter => "dead_letter",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "processed" => Ok(JobStatus::Processed),
            "dead_letter" => Ok(JobStatus::DeadLetter),
            other => Err(Error::Internal(format!(
                "Invalid job status in database: {}",
                other
            ))),
        }
    }
}

/// Durable work item for one inbound website event
///
/// `(tenant_id, event_key)` is unique: the enqueue-time dedup key. Jobs
/// are retained after processing for audit and replay visibility; this
/// subsystem never deletes them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueJob {
    pub id: Uuid,
    pub tenant_id: String,
    pub event_type: String,
    /// Content fingerprint of the event (SHA-256 hex)
    pub event_key: String,
    pub occurred_at: DateTime<Utc>,
    /// Serialized original event envelope
    pub payload_json: String,
    pub status: JobStatus,
    /// Attempts consumed so far; reset to 0 only by manual requeue
    pub attempt_count: i64,
    pub last_error: Option<String>,
    /// Earliest time the job is eligible for pickup
    pub next_attempt_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub dead_lettered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
