use chrono::{DateTime, Utc};

use crate::storage::DataStore;
use crate::tokens::types::{OneTimeToken, TokenError};

use super::postgres::*;
use super::sqlite::*;

/// Store for single-use tokens.
#[derive(Clone)]
pub struct TokenStore {
    store: DataStore,
}

impl TokenStore {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    pub async fn init(&self) -> Result<(), TokenError> {
        match &self.store {
            DataStore::Sqlite(pool) => create_tables_sqlite(pool).await,
            DataStore::Postgres(pool) => create_tables_postgres(pool).await,
        }
    }

    pub async fn insert_token(&self, token: &OneTimeToken) -> Result<(), TokenError> {
        match &self.store {
            DataStore::Sqlite(pool) => insert_token_sqlite(pool, token).await,
            DataStore::Postgres(pool) => insert_token_postgres(pool, token).await,
        }
    }

    pub async fn get_token(
        &self,
        id: &str,
        purpose: &str,
    ) -> Result<Option<OneTimeToken>, TokenError> {
        match &self.store {
            DataStore::Sqlite(pool) => get_token_sqlite(pool, id, purpose).await,
            DataStore::Postgres(pool) => get_token_postgres(pool, id, purpose).await,
        }
    }

    pub async fn mark_used(&self, id: &str) -> Result<(), TokenError> {
        match &self.store {
            DataStore::Sqlite(pool) => mark_used_sqlite(pool, id).await,
            DataStore::Postgres(pool) => mark_used_postgres(pool, id).await,
        }
    }

    pub async fn delete_expired_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, TokenError> {
        match &self.store {
            DataStore::Sqlite(pool) => delete_expired_before_sqlite(pool, cutoff).await,
            DataStore::Postgres(pool) => delete_expired_before_postgres(pool, cutoff).await,
        }
    }
}
