use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum TokenError {
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed, unknown, wrong purpose or digest mismatch
    #[error("Invalid token")]
    Invalid,

    /// Structurally valid but already consumed or past expiry
    #[error("Token expired or already used")]
    ExpiredOrUsed,

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl From<UtilError> for TokenError {
    fn from(err: UtilError) -> Self {
        Self::Crypto(err.to_string())
    }
}

/// What a one-time token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    PasswordReset,
    EmailVerification,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PasswordReset => "password_reset",
            Self::EmailVerification => "email_verification",
        }
    }
}

impl std::fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored token record; the secret half exists only as a digest.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct OneTimeToken {
    pub id: String,
    pub user_id: String,
    pub purpose: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    /// Transitions false→true exactly once; never back
    pub used: bool,
    pub created_at: DateTime<Utc>,
}
