//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up
//! idempotently on every start. All `CREATE TABLE` / `CREATE INDEX`
//! statements use `IF NOT EXISTS` and are safe to re-run.
//!
//! Timestamp columns are TEXT holding RFC 3339 UTC strings bound from
//! Rust; the queue store compares them lexicographically in SQL, which
//! matches chronological order for this format.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer; the enqueue
    // endpoint and the batch worker share this database
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
///
/// Exposed separately from [`init_database`] so tests can bring up the
/// schema on an in-memory pool.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_contacts_table(pool).await?;
    create_leads_table(pool).await?;
    create_activities_table(pool).await?;
    create_ingestion_queue_table(pool).await?;
    create_ingested_events_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores service configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the contacts table
///
/// Tenant-scoped contact identities. Uniqueness is enforced per channel
/// with two partial indexes, not a compound one: a contact can be the
/// unique match via either normalized email or normalized phone.
pub async fn create_contacts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            full_name TEXT,
            email TEXT,
            email_normalized TEXT,
            phone TEXT,
            phone_normalized TEXT,
            source TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_tenant_email
        ON contacts(tenant_id, email_normalized)
        WHERE email_normalized IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_contacts_tenant_phone
        ON contacts(tenant_id, phone_normalized)
        WHERE phone_normalized IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the leads table
///
/// One lead per ingested event, with denormalized listing/valuation
/// details from the payload for dashboard display without joins.
pub async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            contact_id TEXT REFERENCES contacts(id),
            status TEXT NOT NULL DEFAULT 'new',
            lead_type TEXT NOT NULL CHECK (lead_type IN ('website_lead', 'valuation_request')),
            source TEXT,
            message TEXT,
            listing_address TEXT,
            listing_ref TEXT,
            property_address TEXT,
            property_type TEXT,
            bedrooms INTEGER,
            estimated_value REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_tenant ON leads(tenant_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_leads_contact ON leads(contact_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the activities table
///
/// Immutable timeline entries written alongside each lead. Insert-only;
/// the raw payload is retained for later analytics.
pub async fn create_activities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activities (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            lead_id TEXT NOT NULL REFERENCES leads(id),
            contact_id TEXT,
            activity_type TEXT NOT NULL CHECK (activity_type IN ('lead_submitted', 'valuation_requested')),
            summary TEXT NOT NULL,
            occurred_at TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_activities_tenant ON activities(tenant_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_activities_lead ON activities(lead_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the ingestion queue table
///
/// Durable work items with the status state machine. UNIQUE
/// (tenant_id, event_key) is the enqueue-time dedup anchor.
pub async fn create_ingestion_queue_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingestion_queue (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            event_key TEXT NOT NULL,
            occurred_at TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'processed', 'dead_letter')),
            attempt_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            next_attempt_at TEXT NOT NULL,
            processed_at TEXT,
            dead_lettered_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (tenant_id, event_key),
            CHECK (attempt_count >= 0),
            CHECK (length(event_key) = 64)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Pickup query: status = 'pending' AND next_attempt_at <= now
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingestion_queue_due ON ingestion_queue(status, next_attempt_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingestion_queue_dead ON ingestion_queue(dead_lettered_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingestion_queue_tenant ON ingestion_queue(tenant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the ingested events ledger table
///
/// One row per successfully-ingested logical event. UNIQUE
/// (tenant_id, event_key) is the processing-time dedup anchor,
/// independent of the queue table: even if two queue jobs carry the same
/// event, side effects happen at most once.
pub async fn create_ingested_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingested_events (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            event_key TEXT NOT NULL,
            occurred_at TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            processed_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (tenant_id, event_key),
            CHECK (length(event_key) = 64)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ingested_events_tenant ON ingested_events(tenant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or update default settings
///
/// Ensures all required settings exist with default values; NULL values
/// are reset to defaults.
pub async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    // HTTP server settings
    ensure_setting(pool, "http_port", "5830").await?;

    // Queue worker settings
    ensure_setting(pool, "queue_default_batch_limit", "50").await?;
    ensure_setting(pool, "queue_processing_timeout_secs", "600").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        tracing::warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
