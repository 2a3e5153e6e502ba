use crate::audit::types::{AuditError, AuditEvent, StoredAuditEvent};
use crate::storage::DataStore;

use super::postgres::*;
use super::sqlite::*;

/// Append-only store for audit events.
#[derive(Clone)]
pub struct AuditStore {
    store: DataStore,
}

impl AuditStore {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    pub async fn init(&self) -> Result<(), AuditError> {
        match &self.store {
            DataStore::Sqlite(pool) => create_tables_sqlite(pool).await,
            DataStore::Postgres(pool) => create_tables_postgres(pool).await,
        }
    }

    pub async fn insert_event(&self, event: &AuditEvent) -> Result<(), AuditError> {
        match &self.store {
            DataStore::Sqlite(pool) => insert_event_sqlite(pool, event).await,
            DataStore::Postgres(pool) => insert_event_postgres(pool, event).await,
        }
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<StoredAuditEvent>, AuditError> {
        match &self.store {
            DataStore::Sqlite(pool) => recent_sqlite(pool, limit).await,
            DataStore::Postgres(pool) => recent_postgres(pool, limit).await,
        }
    }

    pub async fn events_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredAuditEvent>, AuditError> {
        match &self.store {
            DataStore::Sqlite(pool) => events_for_user_sqlite(pool, user_id, limit).await,
            DataStore::Postgres(pool) => events_for_user_postgres(pool, user_id, limit).await,
        }
    }
}
