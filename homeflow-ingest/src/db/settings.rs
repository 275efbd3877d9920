//! Settings database operations

use homeflow_common::Result;
use sqlx::SqlitePool;

/// Read an integer setting, falling back to the default when the key is
/// absent or not numeric
pub async fn get_i64(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    let value: Option<i64> =
        sqlx::query_scalar("SELECT CAST(value AS INTEGER) FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.unwrap_or(default))
}
