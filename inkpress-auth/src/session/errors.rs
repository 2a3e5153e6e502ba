use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Session revoked")]
    Revoked,

    /// A stale (already-rotated) credential was presented again. The whole
    /// family has been revoked by the time this error is returned.
    #[error("Session reuse detected: family={family_id}, rotation={rotation_count}")]
    ReuseDetected {
        family_id: String,
        rotation_count: i64,
    },

    /// The family hit its rotation ceiling and was revoked.
    #[error("Session rotation limit reached: family={family_id}")]
    RotationLimit { family_id: String },

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("CSRF token error: {0}")]
    CsrfToken(String),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
