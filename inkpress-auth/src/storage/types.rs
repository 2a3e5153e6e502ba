use std::str::FromStr;

use sqlx::{Pool, Postgres, Sqlite};

use super::errors::StorageError;

/// Handle to the shared relational store.
///
/// Cloneable (sqlx pools are reference-counted) and passed explicitly into
/// every store; there is no process-global store in this crate.
#[derive(Clone, Debug)]
pub enum DataStore {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
}

impl DataStore {
    /// Connect from a database URL. `sqlite:` URLs (including
    /// `sqlite::memory:`) get a SQLite pool with `create_if_missing`;
    /// `postgres:`/`postgresql:` URLs a lazy Postgres pool.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        if url.starts_with("sqlite:") {
            let opts = sqlx::sqlite::SqliteConnectOptions::from_str(url)
                .map_err(|e| StorageError::Connection(e.to_string()))?
                .create_if_missing(true);
            // An in-memory database exists per connection; the pool must hold
            // exactly one so every store sees the same tables.
            let max_connections = if url.contains(":memory:") { 1 } else { 5 };
            let pool = sqlx::sqlite::SqlitePoolOptions::new()
                .max_connections(max_connections)
                .connect_with(opts)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            tracing::info!("Connected to SQLite data store");
            Ok(Self::Sqlite(pool))
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let pool = sqlx::PgPool::connect_lazy(url)
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            tracing::info!("Connected to Postgres data store");
            Ok(Self::Postgres(pool))
        } else {
            Err(StorageError::UnsupportedUrl(url.to_string()))
        }
    }

    pub fn as_sqlite(&self) -> Option<&Pool<Sqlite>> {
        match self {
            Self::Sqlite(pool) => Some(pool),
            Self::Postgres(_) => None,
        }
    }

    pub fn as_postgres(&self) -> Option<&Pool<Postgres>> {
        match self {
            Self::Sqlite(_) => None,
            Self::Postgres(pool) => Some(pool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_sqlite_memory() {
        let store = DataStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite should connect");
        assert!(store.as_sqlite().is_some());
        assert!(store.as_postgres().is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        let result = DataStore::connect("mysql://localhost/auth").await;
        assert!(matches!(result, Err(StorageError::UnsupportedUrl(_))));
    }
}
