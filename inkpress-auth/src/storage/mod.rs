mod config;
mod errors;
mod types;

pub use config::{
    DB_TABLE_AUDIT_EVENTS, DB_TABLE_ONE_TIME_TOKENS, DB_TABLE_RATE_LIMIT_BUCKETS,
    DB_TABLE_SESSIONS, DB_TABLE_USERS,
};
pub use errors::StorageError;
pub use types::DataStore;
