use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum RateLimitError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Actions with independent ceilings and windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitAction {
    Login,
    Register,
    PasswordReset,
    ResendVerification,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::PasswordReset => "password_reset",
            Self::ResendVerification => "resend_verification",
        }
    }
}

impl std::fmt::Display for RateLimitAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of a rate-limit check. A limit verdict is an expected security
/// decision, not a fault, so it is not an error value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after: Duration },
}
