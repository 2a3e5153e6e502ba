use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::storage::DB_TABLE_USERS;
use crate::userdb::{
    errors::UserError,
    types::{DELETED_LABEL, User, UserSearchField},
};

fn map_unique_violation(e: sqlx::Error) -> UserError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return UserError::DuplicateEmail;
        }
    }
    UserError::Storage(e.to_string())
}

pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table_name} (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE,
            email_verified BOOLEAN NOT NULL DEFAULT FALSE,
            password_hash TEXT,
            provider TEXT,
            label TEXT NOT NULL,
            avatar_url TEXT,
            is_admin BOOLEAN NOT NULL DEFAULT FALSE,
            failed_attempts BIGINT NOT NULL DEFAULT 0,
            locked_until TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn get_user_by_field_postgres(
    pool: &Pool<Postgres>,
    field: &UserSearchField,
) -> Result<Option<User>, UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    match field {
        UserSearchField::Id(id) => sqlx::query_as::<_, User>(&format!(
            r#"
                SELECT * FROM {table_name} WHERE id = $1
                "#
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string())),
        UserSearchField::Email(email) => sqlx::query_as::<_, User>(&format!(
            r#"
                SELECT * FROM {table_name} WHERE email = $1
                "#
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| UserError::Storage(e.to_string())),
    }
}

pub(super) async fn upsert_user_postgres(
    pool: &Pool<Postgres>,
    user: User,
) -> Result<User, UserError> {
    let table_name = DB_TABLE_USERS.as_str();
    let now = Utc::now();
    let mut updated_user = user;
    updated_user.updated_at = now;

    sqlx::query(&format!(
        r#"
        INSERT INTO {table_name}
            (id, email, email_verified, password_hash, provider, label,
             avatar_url, is_admin, failed_attempts, locked_until, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (id) DO UPDATE SET
            email = EXCLUDED.email,
            email_verified = EXCLUDED.email_verified,
            password_hash = EXCLUDED.password_hash,
            provider = EXCLUDED.provider,
            label = EXCLUDED.label,
            avatar_url = EXCLUDED.avatar_url,
            is_admin = EXCLUDED.is_admin,
            updated_at = EXCLUDED.updated_at
        "#
    ))
    .bind(&updated_user.id)
    .bind(&updated_user.email)
    .bind(updated_user.email_verified)
    .bind(&updated_user.password_hash)
    .bind(&updated_user.provider)
    .bind(&updated_user.label)
    .bind(&updated_user.avatar_url)
    .bind(updated_user.is_admin)
    .bind(updated_user.failed_attempts)
    .bind(updated_user.locked_until)
    .bind(updated_user.created_at)
    .bind(updated_user.updated_at)
    .execute(pool)
    .await
    .map_err(map_unique_violation)?;

    sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT * FROM {table_name} WHERE id = $1
        "#
    ))
    .bind(&updated_user.id)
    .fetch_one(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))
}

pub(super) async fn record_login_failure_postgres(
    pool: &Pool<Postgres>,
    id: &str,
    threshold: u32,
    lock_until: DateTime<Utc>,
) -> Result<(i64, Option<DateTime<Utc>>), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    sqlx::query_as::<_, (i64, Option<DateTime<Utc>>)>(&format!(
        r#"
        UPDATE {table_name} SET
            failed_attempts = failed_attempts + 1,
            locked_until = CASE WHEN failed_attempts + 1 >= $1 THEN $2 ELSE locked_until END,
            updated_at = $3
        WHERE id = $4
        RETURNING failed_attempts, locked_until
        "#
    ))
    .bind(i64::from(threshold))
    .bind(lock_until)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?
    .ok_or(UserError::NotFound)
}

pub(super) async fn record_login_success_postgres(
    pool: &Pool<Postgres>,
    id: &str,
) -> Result<(), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET failed_attempts = 0, locked_until = NULL, updated_at = $1
        WHERE id = $2
        "#
    ))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn set_password_hash_postgres(
    pool: &Pool<Postgres>,
    id: &str,
    password_hash: &str,
) -> Result<(), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    let result = sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET password_hash = $1, updated_at = $2 WHERE id = $3
        "#
    ))
    .bind(password_hash)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(UserError::NotFound);
    }
    Ok(())
}

pub(super) async fn mark_email_verified_postgres(
    pool: &Pool<Postgres>,
    id: &str,
) -> Result<(), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET email_verified = TRUE, updated_at = $1 WHERE id = $2
        "#
    ))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}

pub(super) async fn soft_delete_user_postgres(
    pool: &Pool<Postgres>,
    id: &str,
) -> Result<(), UserError> {
    let table_name = DB_TABLE_USERS.as_str();

    sqlx::query(&format!(
        r#"
        UPDATE {table_name} SET
            email = NULL,
            email_verified = FALSE,
            password_hash = NULL,
            provider = NULL,
            avatar_url = NULL,
            label = $1,
            updated_at = $2
        WHERE id = $3
        "#
    ))
    .bind(DELETED_LABEL)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| UserError::Storage(e.to_string()))?;

    Ok(())
}
