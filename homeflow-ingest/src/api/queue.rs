//! Queue operational endpoints
//!
//! Invoked by schedulers and admin tooling, not by the dashboard UI:
//! trigger batch processing, inspect the dead-letter queue, requeue jobs.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use homeflow_common::db::models::QueueJob;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::settings;
use crate::error::ApiResult;
use crate::queue::{dead_letter, worker};
use crate::AppState;

fn default_list_limit() -> i64 {
    50
}

fn default_bulk_limit() -> i64 {
    100
}

/// Body of POST /api/queue/process
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessRequest {
    /// Batch size; falls back to the `queue_default_batch_limit` setting
    pub limit: Option<i64>,
}

/// POST /api/queue/process
///
/// Runs one worker batch and returns its counters. The external
/// scheduler decides the cadence; this handler has no loop of its own.
pub async fn process_queue(
    State(state): State<AppState>,
    body: Option<Json<ProcessRequest>>,
) -> ApiResult<Json<worker::BatchOutcome>> {
    let requested = body.and_then(|Json(req)| req.limit);
    let limit = match requested {
        Some(limit) => limit,
        None => settings::get_i64(&state.db, "queue_default_batch_limit", 50).await?,
    };

    let outcome = worker::process_batch(&state.db, limit).await?;
    Ok(Json(outcome))
}

/// Query parameters for GET /api/queue/dead-letter
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterQuery {
    pub tenant_id: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// GET /api/queue/dead-letter
///
/// Page of dead-lettered jobs, most recently dead-lettered first,
/// optionally filtered by tenant.
pub async fn list_dead_letter(
    State(state): State<AppState>,
    Query(query): Query<DeadLetterQuery>,
) -> ApiResult<Json<Vec<QueueJob>>> {
    let jobs = dead_letter::list_dead_letter(
        &state.db,
        query.tenant_id.as_deref(),
        query.limit,
        query.offset,
    )
    .await?;

    Ok(Json(jobs))
}

/// Response of POST /api/queue/dead-letter/:id/requeue
#[derive(Debug, serde::Serialize)]
pub struct RequeueResponse {
    /// False when the job is missing or not currently dead-lettered
    pub requeued: bool,
}

/// POST /api/queue/dead-letter/:id/requeue
pub async fn requeue_one(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<RequeueResponse>> {
    let requeued = dead_letter::requeue_one(&state.db, job_id).await?;
    Ok(Json(RequeueResponse { requeued }))
}

/// Body of POST /api/queue/dead-letter/requeue
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkRequeueRequest {
    pub tenant_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// POST /api/queue/dead-letter/requeue
///
/// Requeues one page of dead-lettered jobs and reports how many of the
/// selected page actually transitioned.
pub async fn requeue_bulk(
    State(state): State<AppState>,
    body: Option<Json<BulkRequeueRequest>>,
) -> ApiResult<Json<dead_letter::BulkRequeueOutcome>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let outcome = dead_letter::requeue_bulk(
        &state.db,
        req.tenant_id.as_deref(),
        req.limit.unwrap_or_else(default_bulk_limit),
        req.offset.unwrap_or(0),
    )
    .await?;

    Ok(Json(outcome))
}
