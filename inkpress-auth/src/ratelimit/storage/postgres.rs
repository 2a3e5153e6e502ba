use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::ratelimit::types::RateLimitError;
use crate::storage::DB_TABLE_RATE_LIMIT_BUCKETS;

pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), RateLimitError> {
    let table_name = DB_TABLE_RATE_LIMIT_BUCKETS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            action TEXT NOT NULL,
            bucket_key TEXT NOT NULL,
            window_start TIMESTAMPTZ NOT NULL,
            count BIGINT NOT NULL,
            PRIMARY KEY (action, bucket_key)
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| RateLimitError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn increment_postgres(
    pool: &Pool<Postgres>,
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
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (action, bucket_key) DO UPDATE SET
            count = CASE
                WHEN {table_name}.window_start <= $4 THEN 1
                WHEN {table_name}.count > $5 THEN {table_name}.count
                ELSE {table_name}.count + 1
            END,
            window_start = CASE
                WHEN {table_name}.window_start <= $4 THEN EXCLUDED.window_start
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
    .fetch_one(pool)
    .await
    .map_err(|e| RateLimitError::Storage(e.to_string()))
}

pub(super) async fn reset_postgres(
    pool: &Pool<Postgres>,
    action: &str,
    key: &str,
) -> Result<(), RateLimitError> {
    let table_name = DB_TABLE_RATE_LIMIT_BUCKETS.as_str();

    sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE action = $1 AND bucket_key = $2
        "#
    ))
    .bind(action)
    .bind(key)
    .execute(pool)
    .await
    .map_err(|e| RateLimitError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn delete_stale_postgres(
    pool: &Pool<Postgres>,
    cutoff: DateTime<Utc>,
) -> Result<u64, RateLimitError> {
    let table_name = DB_TABLE_RATE_LIMIT_BUCKETS.as_str();

    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE window_start <= $1
        "#
    ))
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(|e| RateLimitError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}
