use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

use crate::session::ClientInfo;

#[derive(Debug, Error, Clone)]
pub enum AuditError {
    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    LoginSucceeded,
    LoginFailed,
    LockoutTriggered,
    SessionRotated,
    SessionReuseDetected,
    SignedOut,
    Registered,
    EmailVerificationRequested,
    EmailVerified,
    PasswordResetRequested,
    PasswordResetCompleted,
    OAuthSignIn,
    AccountDeleted,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::LockoutTriggered => "lockout_triggered",
            Self::SessionRotated => "session_rotated",
            Self::SessionReuseDetected => "session_reuse_detected",
            Self::SignedOut => "signed_out",
            Self::Registered => "registered",
            Self::EmailVerificationRequested => "email_verification_requested",
            Self::EmailVerified => "email_verified",
            Self::PasswordResetRequested => "password_reset_requested",
            Self::PasswordResetCompleted => "password_reset_completed",
            Self::OAuthSignIn => "oauth_sign_in",
            Self::AccountDeleted => "account_deleted",
        }
    }
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event about to be appended.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    pub user_id: Option<String>,
    pub detail: serde_json::Value,
    pub ip_address: String,
    pub user_agent: String,
    pub success: bool,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind, client: &ClientInfo) -> Self {
        Self {
            kind,
            user_id: None,
            detail: serde_json::Value::Null,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            success: true,
        }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn failure(mut self) -> Self {
        self.success = false;
        self
    }
}

/// A persisted audit row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct StoredAuditEvent {
    pub id: i64,
    pub kind: String,
    pub user_id: Option<String>,
    /// JSON-encoded structured event data
    pub detail: String,
    pub ip_address: String,
    pub user_agent: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}
