use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::audit::types::{AuditError, AuditEvent, StoredAuditEvent};
use crate::storage::DB_TABLE_AUDIT_EVENTS;

pub(super) async fn create_tables_sqlite(pool: &Pool<Sqlite>) -> Result<(), AuditError> {
    let table_name = DB_TABLE_AUDIT_EVENTS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            user_id TEXT,
            detail TEXT NOT NULL,
            ip_address TEXT NOT NULL,
            user_agent TEXT NOT NULL,
            success BOOLEAN NOT NULL,
            created_at TIMESTAMP NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| AuditError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn insert_event_sqlite(
    pool: &Pool<Sqlite>,
    event: &AuditEvent,
) -> Result<(), AuditError> {
    let table_name = DB_TABLE_AUDIT_EVENTS.as_str();
    let detail = serde_json::to_string(&event.detail)
        .map_err(|e| AuditError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (kind, user_id, detail, ip_address, user_agent, success, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#
    ))
    .bind(event.kind.as_str())
    .bind(&event.user_id)
    .bind(detail)
    .bind(&event.ip_address)
    .bind(&event.user_agent)
    .bind(event.success)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| AuditError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn recent_sqlite(
    pool: &Pool<Sqlite>,
    limit: i64,
) -> Result<Vec<StoredAuditEvent>, AuditError> {
    let table_name = DB_TABLE_AUDIT_EVENTS.as_str();

    sqlx::query_as::<_, StoredAuditEvent>(&format!(
        r#"
        SELECT * FROM {table_name} ORDER BY id DESC LIMIT ?
        "#
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AuditError::Storage(e.to_string()))
}

pub(super) async fn events_for_user_sqlite(
    pool: &Pool<Sqlite>,
    user_id: &str,
    limit: i64,
) -> Result<Vec<StoredAuditEvent>, AuditError> {
    let table_name = DB_TABLE_AUDIT_EVENTS.as_str();

    sqlx::query_as::<_, StoredAuditEvent>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE user_id = ? ORDER BY id DESC LIMIT ?
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AuditError::Storage(e.to_string()))
}
