use chrono::{DateTime, Duration, Utc};

use crate::ratelimit::types::{RateLimitAction, RateLimitError};
use crate::storage::DataStore;

use super::postgres::*;
use super::sqlite::*;

/// Store for fixed-window rate-limit buckets.
#[derive(Clone)]
pub struct RateLimitStore {
    store: DataStore,
}

impl RateLimitStore {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    pub async fn init(&self) -> Result<(), RateLimitError> {
        match &self.store {
            DataStore::Sqlite(pool) => create_tables_sqlite(pool).await,
            DataStore::Postgres(pool) => create_tables_postgres(pool).await,
        }
    }

    /// Atomically count an attempt and return the post-state
    /// `(count, window_start)`.
    ///
    /// One statement performs all of: reset an expired window, increment an
    /// open one, and pin the count at `ceiling + 1` as the rejection
    /// sentinel so rejected attempts are not counted further.
    pub async fn increment(
        &self,
        action: RateLimitAction,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
        ceiling: u32,
    ) -> Result<(i64, DateTime<Utc>), RateLimitError> {
        let cutoff = now - window;
        match &self.store {
            DataStore::Sqlite(pool) => {
                increment_sqlite(pool, action.as_str(), key, now, cutoff, ceiling).await
            }
            DataStore::Postgres(pool) => {
                increment_postgres(pool, action.as_str(), key, now, cutoff, ceiling).await
            }
        }
    }

    pub async fn reset(&self, action: RateLimitAction, key: &str) -> Result<(), RateLimitError> {
        match &self.store {
            DataStore::Sqlite(pool) => reset_sqlite(pool, action.as_str(), key).await,
            DataStore::Postgres(pool) => reset_postgres(pool, action.as_str(), key).await,
        }
    }

    pub async fn delete_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, RateLimitError> {
        match &self.store {
            DataStore::Sqlite(pool) => delete_stale_sqlite(pool, cutoff).await,
            DataStore::Postgres(pool) => delete_stale_postgres(pool, cutoff).await,
        }
    }
}
