use chrono::{DateTime, Utc};

use crate::session::errors::SessionError;
use crate::session::types::{RevocationReason, Session};
use crate::storage::DataStore;

use super::postgres::*;
use super::sqlite::*;

/// Store for durable session rows.
#[derive(Clone)]
pub struct SessionStore {
    store: DataStore,
}

impl SessionStore {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    pub async fn init(&self) -> Result<(), SessionError> {
        match &self.store {
            DataStore::Sqlite(pool) => create_tables_sqlite(pool).await,
            DataStore::Postgres(pool) => create_tables_postgres(pool).await,
        }
    }

    pub async fn insert_session(&self, session: &Session) -> Result<(), SessionError> {
        match &self.store {
            DataStore::Sqlite(pool) => insert_session_sqlite(pool, session).await,
            DataStore::Postgres(pool) => insert_session_postgres(pool, session).await,
        }
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, SessionError> {
        match &self.store {
            DataStore::Sqlite(pool) => get_session_sqlite(pool, id).await,
            DataStore::Postgres(pool) => get_session_postgres(pool, id).await,
        }
    }

    /// Optimistic Active→Rotated transition: succeeds (returns `true`) for at
    /// most one caller; the condition `NOT rotated AND NOT revoked` is part of
    /// the UPDATE so concurrent refreshes cannot both win.
    pub async fn mark_rotated(&self, id: &str) -> Result<bool, SessionError> {
        match &self.store {
            DataStore::Sqlite(pool) => mark_rotated_sqlite(pool, id).await,
            DataStore::Postgres(pool) => mark_rotated_postgres(pool, id).await,
        }
    }

    /// Revoke every not-yet-revoked session in a family. Idempotent; the
    /// first recorded reason wins. Returns the number of rows touched.
    pub async fn revoke_family(
        &self,
        family_id: &str,
        reason: RevocationReason,
    ) -> Result<u64, SessionError> {
        let revoked = match &self.store {
            DataStore::Sqlite(pool) => revoke_family_sqlite(pool, family_id, reason.as_str()).await,
            DataStore::Postgres(pool) => {
                revoke_family_postgres(pool, family_id, reason.as_str()).await
            }
        }?;

        if revoked > 0 {
            tracing::info!(family_id = %family_id, reason = %reason, revoked, "Session family revoked");
        }
        Ok(revoked)
    }

    /// Revoke every session family belonging to a user (password reset,
    /// account deletion).
    pub async fn revoke_all_for_user(
        &self,
        user_id: &str,
        reason: RevocationReason,
    ) -> Result<u64, SessionError> {
        match &self.store {
            DataStore::Sqlite(pool) => {
                revoke_all_for_user_sqlite(pool, user_id, reason.as_str()).await
            }
            DataStore::Postgres(pool) => {
                revoke_all_for_user_postgres(pool, user_id, reason.as_str()).await
            }
        }
    }

    /// Delete sessions whose expiry passed before `cutoff`.
    pub async fn delete_expired_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        match &self.store {
            DataStore::Sqlite(pool) => delete_expired_before_sqlite(pool, cutoff).await,
            DataStore::Postgres(pool) => delete_expired_before_postgres(pool, cutoff).await,
        }
    }

    /// Delete revoked sessions last touched before `cutoff`.
    pub async fn delete_revoked_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        match &self.store {
            DataStore::Sqlite(pool) => delete_revoked_before_sqlite(pool, cutoff).await,
            DataStore::Postgres(pool) => delete_revoked_before_postgres(pool, cutoff).await,
        }
    }

    /// All sessions in a family, oldest rotation first. Test and admin
    /// helper.
    pub async fn get_family(&self, family_id: &str) -> Result<Vec<Session>, SessionError> {
        match &self.store {
            DataStore::Sqlite(pool) => get_family_sqlite(pool, family_id).await,
            DataStore::Postgres(pool) => get_family_postgres(pool, family_id).await,
        }
    }
}
