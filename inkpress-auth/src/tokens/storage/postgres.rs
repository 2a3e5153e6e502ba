use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::storage::DB_TABLE_ONE_TIME_TOKENS;
use crate::tokens::types::{OneTimeToken, TokenError};

pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), TokenError> {
    let table_name = DB_TABLE_ONE_TIME_TOKENS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            purpose TEXT NOT NULL,
            token_hash TEXT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            used BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| TokenError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn insert_token_postgres(
    pool: &Pool<Postgres>,
    token: &OneTimeToken,
) -> Result<(), TokenError> {
    let table_name = DB_TABLE_ONE_TIME_TOKENS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (id, user_id, purpose, token_hash, expires_at, used, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#
    ))
    .bind(&token.id)
    .bind(&token.user_id)
    .bind(&token.purpose)
    .bind(&token.token_hash)
    .bind(token.expires_at)
    .bind(token.used)
    .bind(token.created_at)
    .execute(pool)
    .await
    .map_err(|e| TokenError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_token_postgres(
    pool: &Pool<Postgres>,
    id: &str,
    purpose: &str,
) -> Result<Option<OneTimeToken>, TokenError> {
    let table_name = DB_TABLE_ONE_TIME_TOKENS.as_str();

    sqlx::query_as::<_, OneTimeToken>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE id = $1 AND purpose = $2
        "#
    ))
    .bind(id)
    .bind(purpose)
    .fetch_optional(pool)
    .await
    .map_err(|e| TokenError::Storage(e.to_string()))
}

pub(super) async fn mark_used_postgres(pool: &Pool<Postgres>, id: &str) -> Result<(), TokenError> {
    let table_name = DB_TABLE_ONE_TIME_TOKENS.as_str();

    sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET used = TRUE WHERE id = $1
        "#
    ))
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| TokenError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn delete_expired_before_postgres(
    pool: &Pool<Postgres>,
    cutoff: DateTime<Utc>,
) -> Result<u64, TokenError> {
    let table_name = DB_TABLE_ONE_TIME_TOKENS.as_str();

    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE expires_at <= $1
        "#
    ))
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(|e| TokenError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}
