//! Website event submission endpoint
//!
//! The single inbound operation of this service. Authentication and
//! hostname→tenant resolution happen upstream; a request reaching this
//! handler carries an authoritative tenant id in its body.

use axum::{extract::State, http::StatusCode, Json};
use homeflow_common::events::WebsiteEvent;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::queue::enqueue;
use crate::AppState;

/// Enqueue result returned to the producer
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEventResponse {
    pub accepted: bool,
    /// True when an identical event was already queued; `job_id` then
    /// refers to the existing job
    pub duplicate: bool,
    pub job_id: Uuid,
}

/// POST /api/events
///
/// Accepts a JSON body matching the WebsiteEvent union and enqueues it
/// for ingestion. Idempotent: retrying the same event returns the same
/// job id with `duplicate: true`. A body that does not parse into the
/// union is rejected by the extractor (422) before reaching the queue.
pub async fn submit_event(
    State(state): State<AppState>,
    Json(event): Json<WebsiteEvent>,
) -> ApiResult<(StatusCode, Json<SubmitEventResponse>)> {
    let outcome = enqueue(&state.db, &event).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitEventResponse {
            accepted: true,
            duplicate: outcome.duplicate,
            job_id: outcome.job_id,
        }),
    ))
}
