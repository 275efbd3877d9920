//! Retry backoff policy
//!
//! Fixed delay table, indexed by how many attempts the job has consumed;
//! the delay grows per attempt and plateaus at 30 minutes.

use chrono::Duration;

/// A job is dead-lettered instead of rescheduled on its 5th failed attempt
pub const MAX_QUEUE_ATTEMPTS: i64 = 5;

/// Delay before attempt N+1, indexed by min(N-1, last)
const BACKOFF_SCHEDULE_SECS: [i64; 4] = [30, 120, 600, 1800];

/// Delay to apply after the given (1-based) failed attempt
pub fn backoff_delay(attempt_count: i64) -> Duration {
    let last = (BACKOFF_SCHEDULE_SECS.len() - 1) as i64;
    let index = (attempt_count - 1).clamp(0, last) as usize;
    Duration::seconds(BACKOFF_SCHEDULE_SECS[index])
}
