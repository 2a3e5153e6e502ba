use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::ratelimit::types::RateLimitError;
use crate::storage::DB_TABLE_RATE_LIMIT_BUCKETS;

pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), RateLimitError> {
    let table_name = DB_TABLE_RATE_LIMIT_BUCKETS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            action TEXT NOT NULL,
            bucket_key TEXT NOT NULL,
            window_start TIMESTAMP NOT NULL,
            count INTEGER NOT NULL,
            PRIMARY KEY (action, bucket_key)
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| RateLimitError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn increment_sqlite(
    pool: &Pool<Sqlite>,
    action: &str,
    key: &str,
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
    ceiling: u32,
) -> Result<(i64, DateTime<Utc>), RateLimitError> {
    let table_name = DB_TABLE_RATE_LIMIT_BUCKETS.as_str();

    sqlx::query_as::<_, (i64, DateTime<Utc>)>(&format!(
        r#"
        INSERT INTO {table_name} (action, bucket_key, window_start, count)
        VALUES (?, ?, ?, 1)
        ON CONFLICT (action, bucket_key) DO UPDATE SET
            count = CASE
                WHEN {table_name}.window_start <= ? THEN 1
                WHEN {table_name}.count > ? THEN {table_name}.count
                ELSE {table_name}.count + 1
            END,
            window_start = CASE
                WHEN {table_name}.window_start <= ? THEN excluded.window_start
                ELSE {table_name}.window_start
            END
        RETURNING count, window_start
        "#
    ))
    .bind(action)
    .bind(key)
    .bind(now)
    .bind(cutoff)
    .bind(i64::from(ceiling))
    .bind(cutoff)
    .fetch_one(pool)
    .await
    .map_err(|e| RateLimitError::Storage(e.to_string()))
}

pub(super) async fn reset_sqlite(
    pool: &Pool<Sqlite>,
    action: &str,
    key: &str,
) -> Result<(), RateLimitError> {
    let table_name = DB_TABLE_RATE_LIMIT_BUCKETS.as_str();

    sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE action = ? AND bucket_key = ?
        "#
    ))
    .bind(action)
    .bind(key)
    .execute(pool)
    .await
    .map_err(|e| RateLimitError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn delete_stale_sqlite(
    pool: &Pool<Sqlite>,
    cutoff: DateTime<Utc>,
) -> Result<u64, RateLimitError> {
    let table_name = DB_TABLE_RATE_LIMIT_BUCKETS.as_str();

    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE window_start <= ?
        "#
    ))
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(|e| RateLimitError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}
