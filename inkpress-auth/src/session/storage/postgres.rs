use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::session::errors::SessionError;
use crate::session::types::Session;
use crate::storage::DB_TABLE_SESSIONS;

pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            family_id TEXT NOT NULL,
            rotation_count BIGINT NOT NULL,
            remembered BOOLEAN NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            ip_address TEXT NOT NULL,
            user_agent TEXT NOT NULL,
            rotated BOOLEAN NOT NULL DEFAULT FALSE,
            revoked BOOLEAN NOT NULL DEFAULT FALSE,
            revoked_reason TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS {table_name}_family_idx ON {table_name} (family_id)
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn insert_session_postgres(
    pool: &Pool<Postgres>,
    session: &Session,
) -> Result<(), SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name}
            (id, user_id, family_id, rotation_count, remembered, expires_at,
             ip_address, user_agent, rotated, revoked, revoked_reason, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#
    ))
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.family_id)
    .bind(session.rotation_count)
    .bind(session.remembered)
    .bind(session.expires_at)
    .bind(&session.ip_address)
    .bind(&session.user_agent)
    .bind(session.rotated)
    .bind(session.revoked)
    .bind(&session.revoked_reason)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_session_postgres(
    pool: &Pool<Postgres>,
    id: &str,
) -> Result<Option<Session>, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    sqlx::query_as::<_, Session>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE id = $1
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))
}

pub(super) async fn mark_rotated_postgres(
    pool: &Pool<Postgres>,
    id: &str,
) -> Result<bool, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET rotated = TRUE, updated_at = $1
        WHERE id = $2 AND rotated = FALSE AND revoked = FALSE
        "#
    ))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected() == 1)
}

pub(super) async fn revoke_family_postgres(
    pool: &Pool<Postgres>,
    family_id: &str,
    reason: &str,
) -> Result<u64, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET
            revoked = TRUE,
            revoked_reason = COALESCE(revoked_reason, $1),
            updated_at = $2
        WHERE family_id = $3 AND revoked = FALSE
        "#
    ))
    .bind(reason)
    .bind(Utc::now())
    .bind(family_id)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}

pub(super) async fn revoke_all_for_user_postgres(
    pool: &Pool<Postgres>,
    user_id: &str,
    reason: &str,
) -> Result<u64, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET
            revoked = TRUE,
            revoked_reason = COALESCE(revoked_reason, $1),
            updated_at = $2
        WHERE user_id = $3 AND revoked = FALSE
        "#
    ))
    .bind(reason)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_expired_before_postgres(
    pool: &Pool<Postgres>,
    cutoff: DateTime<Utc>,
) -> Result<u64, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE expires_at <= $1
        "#
    ))
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_revoked_before_postgres(
    pool: &Pool<Postgres>,
    cutoff: DateTime<Utc>,
) -> Result<u64, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE revoked = TRUE AND updated_at <= $1
        "#
    ))
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}

pub(super) async fn get_family_postgres(
    pool: &Pool<Postgres>,
    family_id: &str,
) -> Result<Vec<Session>, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    sqlx::query_as::<_, Session>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE family_id = $1 ORDER BY rotation_count ASC
        "#
    ))
    .bind(family_id)
    .fetch_all(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))
}
