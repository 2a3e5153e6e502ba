use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::audit::types::{AuditError, AuditEvent, StoredAuditEvent};
use crate::storage::DB_TABLE_AUDIT_EVENTS;

pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), AuditError> {
    let table_name = DB_TABLE_AUDIT_EVENTS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id BIGSERIAL PRIMARY KEY,
            kind TEXT NOT NULL,
            user_id TEXT,
            detail TEXT NOT NULL,
            ip_address TEXT NOT NULL,
            user_agent TEXT NOT NULL,
            success BOOLEAN NOT NULL,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| AuditError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn insert_event_postgres(
    pool: &Pool<Postgres>,
    event: &AuditEvent,
) -> Result<(), AuditError> {
    let table_name = DB_TABLE_AUDIT_EVENTS.as_str();
    let detail = serde_json::to_string(&event.detail)
        .map_err(|e| AuditError::Storage(e.to_string()))?;

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name} (kind, user_id, detail, ip_address, user_agent, success, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
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

pub(super) async fn recent_postgres(
    pool: &Pool<Postgres>,
    limit: i64,
) -> Result<Vec<StoredAuditEvent>, AuditError> {
    let table_name = DB_TABLE_AUDIT_EVENTS.as_str();

    sqlx::query_as::<_, StoredAuditEvent>(&format!(
        r#"
        SELECT * FROM {table_name} ORDER BY id DESC LIMIT $1
        "#
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AuditError::Storage(e.to_string()))
}

pub(super) async fn events_for_user_postgres(
    pool: &Pool<Postgres>,
    user_id: &str,
    limit: i64,
) -> Result<Vec<StoredAuditEvent>, AuditError> {
    let table_name = DB_TABLE_AUDIT_EVENTS.as_str();

    sqlx::query_as::<_, StoredAuditEvent>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE user_id = $1 ORDER BY id DESC LIMIT $2
        "#
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| AuditError::Storage(e.to_string()))
}
