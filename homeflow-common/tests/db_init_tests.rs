//! Tests for database initialization
//!
//! Covers automatic database creation, idempotent re-initialization,
//! default settings, and the uniqueness constraints the ingestion
//! pipeline depends on.

use homeflow_common::db::init::{create_schema, init_database};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn memory_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("subdir").join("homeflow.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());

    // Verify database file was created (including the parent directory)
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("homeflow.db");

    let pool1 = init_database(&db_path).await.unwrap();
    drop(pool1);

    // Second init against the same file must succeed without error
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("homeflow.db");

    let pool = init_database(&db_path).await.unwrap();

    for key in [
        "http_port",
        "queue_default_batch_limit",
        "queue_processing_timeout_secs",
    ] {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&pool)
            .await
            .unwrap();
        assert!(value.is_some(), "Missing default setting '{}'", key);
    }
}

#[tokio::test]
async fn test_queue_event_key_unique_per_tenant() {
    let pool = memory_pool().await;
    let key = "a".repeat(64);
    let now = "2026-03-01T10:00:00+00:00";

    let insert = |tenant: &str, id: &str| {
        let key = key.clone();
        let tenant = tenant.to_string();
        let id = id.to_string();
        let pool = pool.clone();
        async move {
            sqlx::query(
                r#"
                INSERT INTO ingestion_queue
                    (id, tenant_id, event_type, event_key, occurred_at, payload_json,
                     status, attempt_count, next_attempt_at, created_at, updated_at)
                VALUES (?, ?, 'website.lead.submitted', ?, ?, '{}', 'pending', 0, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(tenant)
            .bind(key)
            .bind(now)
            .bind(now)
            .bind(now)
            .bind(now)
            .execute(&pool)
            .await
        }
    };

    insert("t1", "job-1").await.unwrap();

    // Same tenant + same event key must be rejected
    let dup = insert("t1", "job-2").await;
    assert!(dup.is_err(), "Duplicate (tenant, event_key) was accepted");

    // Same event key under a different tenant is fine (no cross-tenant dedup)
    insert("t2", "job-3").await.unwrap();
}

#[tokio::test]
async fn test_contact_email_unique_per_tenant() {
    let pool = memory_pool().await;
    let now = "2026-03-01T10:00:00+00:00";

    let insert = |id: &str, tenant: &str, email: Option<&str>, phone: Option<&str>| {
        let pool = pool.clone();
        let id = id.to_string();
        let tenant = tenant.to_string();
        let email = email.map(|s| s.to_string());
        let phone = phone.map(|s| s.to_string());
        async move {
            sqlx::query(
                r#"
                INSERT INTO contacts
                    (id, tenant_id, email_normalized, phone_normalized, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(tenant)
            .bind(email)
            .bind(phone)
            .bind(now)
            .bind(now)
            .execute(&pool)
            .await
        }
    };

    insert("c1", "t1", Some("jane@x.com"), None).await.unwrap();
    assert!(insert("c2", "t1", Some("jane@x.com"), None).await.is_err());

    // Different tenant, same email: allowed
    insert("c3", "t2", Some("jane@x.com"), None).await.unwrap();

    // NULL email does not collide with NULL email (partial index)
    insert("c4", "t1", None, Some("15551234567")).await.unwrap();
    insert("c5", "t1", None, Some("15559876543")).await.unwrap();
    assert!(insert("c6", "t1", None, Some("15551234567")).await.is_err());
}

#[tokio::test]
async fn test_ledger_event_key_unique_per_tenant() {
    let pool = memory_pool().await;
    let key = "b".repeat(64);
    let now = "2026-03-01T10:00:00+00:00";

    let insert = |id: &str, tenant: &str| {
        let pool = pool.clone();
        let id = id.to_string();
        let tenant = tenant.to_string();
        let key = key.clone();
        async move {
            sqlx::query(
                r#"
                INSERT INTO ingested_events
                    (id, tenant_id, event_type, event_key, occurred_at, payload_json,
                     processed_at, created_at)
                VALUES (?, ?, 'website.lead.submitted', ?, ?, '{}', ?, ?)
                "#,
            )
            .bind(id)
            .bind(tenant)
            .bind(key)
            .bind(now)
            .bind(now)
            .bind(now)
            .execute(&pool)
            .await
        }
    };

    insert("e1", "t1").await.unwrap();
    assert!(insert("e2", "t1").await.is_err());
    insert("e3", "t2").await.unwrap();
}
