//! Database table configuration

use std::env;
use std::sync::LazyLock;

/// Table prefix from environment variable
pub(crate) static TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("DB_TABLE_PREFIX").unwrap_or_else(|_| "ink_".to_string()));

/// Users table name
pub static DB_TABLE_USERS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_USERS").unwrap_or_else(|_| format!("{}{}", *TABLE_PREFIX, "users"))
});

/// Sessions table name
pub static DB_TABLE_SESSIONS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_SESSIONS").unwrap_or_else(|_| format!("{}{}", *TABLE_PREFIX, "sessions"))
});

/// One-time tokens table name (password reset, email verification)
pub static DB_TABLE_ONE_TIME_TOKENS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_ONE_TIME_TOKENS")
        .unwrap_or_else(|_| format!("{}{}", *TABLE_PREFIX, "one_time_tokens"))
});

/// Rate limit buckets table name
pub static DB_TABLE_RATE_LIMIT_BUCKETS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_RATE_LIMIT_BUCKETS")
        .unwrap_or_else(|_| format!("{}{}", *TABLE_PREFIX, "rate_limit_buckets"))
});

/// Audit events table name
pub static DB_TABLE_AUDIT_EVENTS: LazyLock<String> = LazyLock::new(|| {
    env::var("DB_TABLE_AUDIT_EVENTS")
        .unwrap_or_else(|_| format!("{}{}", *TABLE_PREFIX, "audit_events"))
});
