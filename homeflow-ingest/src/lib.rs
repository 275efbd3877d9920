//! homeflow-ingest library - Website event ingestion service
//!
//! Accepts inbound website events (lead submissions, valuation
//! requests), queues them durably with content-based dedup, and
//! processes them in externally-scheduled batches with exactly-once
//! effects via the idempotency ledger.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod ingest;
pub mod queue;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
///
/// The pool is constructed once by the process entry point and injected
/// here; acquiring it is the capability check for touching the store.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/events", post(api::events::submit_event))
        .route("/api/queue/process", post(api::queue::process_queue))
        .route("/api/queue/dead-letter", get(api::queue::list_dead_letter))
        .route("/api/queue/dead-letter/requeue", post(api::queue::requeue_bulk))
        .route("/api/queue/dead-letter/:id/requeue", post(api::queue::requeue_one))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
