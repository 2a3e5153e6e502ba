use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

use crate::session::errors::SessionError;
use crate::session::types::Session;
use crate::storage::DB_TABLE_SESSIONS;

pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            family_id TEXT NOT NULL,
            rotation_count INTEGER NOT NULL,
            remembered BOOLEAN NOT NULL,
            expires_at TIMESTAMP NOT NULL,
            ip_address TEXT NOT NULL,
            user_agent TEXT NOT NULL,
            rotated BOOLEAN NOT NULL DEFAULT false,
            revoked BOOLEAN NOT NULL DEFAULT false,
            revoked_reason TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
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

pub(super) async fn insert_session_sqlite(
    pool: &Pool<Sqlite>,
    session: &Session,
) -> Result<(), SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name}
            (id, user_id, family_id, rotation_count, remembered, expires_at,
             ip_address, user_agent, rotated, revoked, revoked_reason, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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

pub(super) async fn get_session_sqlite(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<Option<Session>, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    sqlx::query_as::<_, Session>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))
}

pub(super) async fn mark_rotated_sqlite(
    pool: &Pool<Sqlite>,
    id: &str,
) -> Result<bool, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET rotated = true, updated_at = ?
        WHERE id = ? AND rotated = false AND revoked = false
        "#
    ))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected() == 1)
}

pub(super) async fn revoke_family_sqlite(
    pool: &Pool<Sqlite>,
    family_id: &str,
    reason: &str,
) -> Result<u64, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET
            revoked = true,
            revoked_reason = COALESCE(revoked_reason, ?),
            updated_at = ?
        WHERE family_id = ? AND revoked = false
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

pub(super) async fn revoke_all_for_user_sqlite(
    pool: &Pool<Sqlite>,
    user_id: &str,
    reason: &str,
) -> Result<u64, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET
            revoked = true,
            revoked_reason = COALESCE(revoked_reason, ?),
            updated_at = ?
        WHERE user_id = ? AND revoked = false
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

pub(super) async fn delete_expired_before_sqlite(
    pool: &Pool<Sqlite>,
    cutoff: DateTime<Utc>,
) -> Result<u64, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE expires_at <= ?
        "#
    ))
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}

pub(super) async fn delete_revoked_before_sqlite(
    pool: &Pool<Sqlite>,
    cutoff: DateTime<Utc>,
) -> Result<u64, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    let result = sqlx::query(&format!(
        r#"
        DELETE FROM {table_name} WHERE revoked = true AND updated_at <= ?
        "#
    ))
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))?;

    Ok(result.rows_affected())
}

pub(super) async fn get_family_sqlite(
    pool: &Pool<Sqlite>,
    family_id: &str,
) -> Result<Vec<Session>, SessionError> {
    let table_name = DB_TABLE_SESSIONS.as_str();

    sqlx::query_as::<_, Session>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE family_id = ? ORDER BY rotation_count ASC
        "#
    ))
    .bind(family_id)
    .fetch_all(pool)
    .await
    .map_err(|e| SessionError::Storage(e.to_string()))
}
