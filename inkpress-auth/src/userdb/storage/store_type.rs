use chrono::{DateTime, Utc};

use crate::storage::DataStore;
use crate::userdb::{
    errors::UserError,
    types::{User, UserSearchField},
};

use super::postgres::*;
use super::sqlite::*;

/// Store for user identities, including the lockout columns.
#[derive(Clone)]
pub struct UserStore {
    store: DataStore,
}

impl UserStore {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    /// Create the users table if it does not exist yet.
    pub async fn init(&self) -> Result<(), UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => create_tables_sqlite(pool).await,
            DataStore::Postgres(pool) => create_tables_postgres(pool).await,
        }
    }

    /// Get a user by their ID
    #[tracing::instrument(skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, UserError> {
        self.get_user_by(UserSearchField::Id(id.to_string())).await
    }

    #[tracing::instrument(skip(self), fields(user_field = %field))]
    pub async fn get_user_by(&self, field: UserSearchField) -> Result<Option<User>, UserError> {
        let result = match &self.store {
            DataStore::Sqlite(pool) => get_user_by_field_sqlite(pool, &field).await,
            DataStore::Postgres(pool) => get_user_by_field_postgres(pool, &field).await,
        };

        match &result {
            Ok(found) => tracing::debug!(found = found.is_some(), "User lookup completed"),
            Err(e) => tracing::error!(error = %e, "User lookup failed"),
        }

        result
    }

    /// Create or update a user. A violation of the email uniqueness
    /// constraint surfaces as [`UserError::DuplicateEmail`].
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn upsert_user(&self, user: User) -> Result<User, UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => upsert_user_sqlite(pool, user).await,
            DataStore::Postgres(pool) => upsert_user_postgres(pool, user).await,
        }
    }

    /// Atomically bump the consecutive-failure counter, setting `locked_until`
    /// in the same statement once the counter reaches `threshold`. Returns the
    /// post-increment counter and lock state.
    pub async fn record_login_failure(
        &self,
        id: &str,
        threshold: u32,
        lock_until: DateTime<Utc>,
    ) -> Result<(i64, Option<DateTime<Utc>>), UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => {
                record_login_failure_sqlite(pool, id, threshold, lock_until).await
            }
            DataStore::Postgres(pool) => {
                record_login_failure_postgres(pool, id, threshold, lock_until).await
            }
        }
    }

    /// Reset the failure counter and clear any lock. Called on every
    /// successful authentication.
    pub async fn record_login_success(&self, id: &str) -> Result<(), UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => record_login_success_sqlite(pool, id).await,
            DataStore::Postgres(pool) => record_login_success_postgres(pool, id).await,
        }
    }

    pub async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<(), UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => set_password_hash_sqlite(pool, id, password_hash).await,
            DataStore::Postgres(pool) => set_password_hash_postgres(pool, id, password_hash).await,
        }
    }

    pub async fn mark_email_verified(&self, id: &str) -> Result<(), UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => mark_email_verified_sqlite(pool, id).await,
            DataStore::Postgres(pool) => mark_email_verified_postgres(pool, id).await,
        }
    }

    /// Null out personal fields and write the tombstone label. The row stays
    /// so authored content keeps a referentially valid owner.
    #[tracing::instrument(skip(self), fields(user_id = %id))]
    pub async fn soft_delete_user(&self, id: &str) -> Result<(), UserError> {
        match &self.store {
            DataStore::Sqlite(pool) => soft_delete_user_sqlite(pool, id).await,
            DataStore::Postgres(pool) => soft_delete_user_postgres(pool, id).await,
        }
    }
}
