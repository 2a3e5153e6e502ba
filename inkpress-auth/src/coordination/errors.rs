//! The externally visible error taxonomy.
//!
//! Expected security-decision outcomes and true faults share one enum but
//! stay distinguishable by variant. Wrong password and unknown email produce
//! the identical `InvalidCredentials`; reuse detection is audited and logged
//! distinctly before it surfaces as plain `SessionInvalid`; anything
//! unexpected during a security-critical step becomes `Internal`, which
//! denies. `From` conversions log at the boundary, in full detail, so the
//! caller-facing value can stay terse.

use chrono::Duration;
use thiserror::Error;

use crate::credentials::CredentialError;
use crate::mail::MailError;
use crate::oauth2::OAuth2Error;
use crate::ratelimit::RateLimitError;
use crate::session::SessionError;
use crate::tokens::TokenError;
use crate::userdb::UserError;
use crate::utils::UtilError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password or unknown email; externally indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked; try again in {} seconds", remaining.num_seconds())]
    AccountLocked { remaining: Duration },

    #[error("Too many requests; retry in {} seconds", retry_after.num_seconds())]
    RateLimited { retry_after: Duration },

    /// Expired, revoked or unknown session; forces re-login
    #[error("Session is invalid")]
    SessionInvalid,

    #[error("Token expired or already used")]
    TokenExpiredOrUsed,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream provider timed out")]
    UpstreamTimeout,

    #[error("Upstream network error")]
    UpstreamNetwork,

    #[error("Upstream provider rejected the request")]
    UpstreamRejected,

    #[error("Mail delivery failed")]
    Mail,

    /// Catch-all; full detail is logged server-side only
    #[error("Internal error")]
    Internal,
}

impl AuthError {
    /// Log the error and return self, for chaining at the site where an
    /// error is both produced and surfaced.
    pub fn log(self) -> Self {
        match &self {
            Self::InvalidCredentials => tracing::debug!("Invalid credentials"),
            Self::AccountLocked { remaining } => tracing::debug!(
                remaining_secs = remaining.num_seconds(),
                "Account locked"
            ),
            Self::RateLimited { retry_after } => tracing::debug!(
                retry_after_secs = retry_after.num_seconds(),
                "Rate limited"
            ),
            Self::SessionInvalid => tracing::debug!("Session invalid"),
            Self::TokenExpiredOrUsed => tracing::debug!("Token expired or used"),
            Self::Validation(msg) => tracing::debug!("Validation failed: {}", msg),
            Self::Conflict(msg) => tracing::debug!("Conflict: {}", msg),
            Self::UpstreamTimeout => tracing::warn!("Upstream provider timed out"),
            Self::UpstreamNetwork => tracing::warn!("Upstream network error"),
            Self::UpstreamRejected => tracing::warn!("Upstream provider rejected the request"),
            Self::Mail => tracing::warn!("Mail delivery failed"),
            Self::Internal => tracing::error!("Internal error"),
        }
        self
    }
}

// Conversions log the full internal detail here, at the boundary; the
// returned variant carries none of it.

impl From<UserError> for AuthError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::DuplicateEmail => {
                Self::Conflict("Email is already registered".to_string())
            }
            UserError::NotFound => {
                tracing::error!("User row vanished mid-operation");
                Self::Internal
            }
            UserError::Storage(msg) => {
                tracing::error!(error = %msg, "User storage error");
                Self::Internal
            }
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound
            | SessionError::Expired
            | SessionError::Revoked
            | SessionError::RotationLimit { .. }
            | SessionError::ReuseDetected { .. } => {
                tracing::debug!(error = %err, "Session rejected");
                Self::SessionInvalid
            }
            SessionError::CsrfToken(msg) => {
                tracing::debug!(error = %msg, "CSRF rejected");
                Self::SessionInvalid
            }
            SessionError::Storage(msg) => {
                tracing::error!(error = %msg, "Session storage error");
                Self::Internal
            }
            SessionError::Crypto(msg) | SessionError::Cookie(msg) => {
                tracing::error!(error = %msg, "Session plumbing error");
                Self::Internal
            }
            SessionError::Utils(e) => {
                tracing::error!(error = %e, "Session utils error");
                Self::Internal
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid | TokenError::ExpiredOrUsed => {
                tracing::debug!(error = %err, "One-time token rejected");
                Self::TokenExpiredOrUsed
            }
            TokenError::Storage(msg) => {
                tracing::error!(error = %msg, "Token storage error");
                Self::Internal
            }
            TokenError::Crypto(msg) => {
                tracing::error!(error = %msg, "Token crypto error");
                Self::Internal
            }
        }
    }
}

impl From<RateLimitError> for AuthError {
    fn from(err: RateLimitError) -> Self {
        let RateLimitError::Storage(msg) = err;
        tracing::error!(error = %msg, "Rate limit storage error");
        Self::Internal
    }
}

impl From<OAuth2Error> for AuthError {
    fn from(err: OAuth2Error) -> Self {
        match err {
            OAuth2Error::Timeout => {
                tracing::warn!("OAuth2 provider exchange timed out");
                Self::UpstreamTimeout
            }
            OAuth2Error::Network(msg) => {
                tracing::warn!(error = %msg, "OAuth2 provider network failure");
                Self::UpstreamNetwork
            }
            OAuth2Error::Rejected(msg) | OAuth2Error::Serde(msg) => {
                tracing::warn!(error = %msg, "OAuth2 provider rejected or returned garbage");
                Self::UpstreamRejected
            }
            OAuth2Error::NotConfigured(provider) => {
                tracing::error!(provider = %provider, "OAuth2 provider not configured");
                Self::Internal
            }
        }
    }
}

impl From<MailError> for AuthError {
    fn from(err: MailError) -> Self {
        tracing::warn!(error = %err, "Mail delivery failed after retries");
        Self::Mail
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        tracing::error!(error = %err, "Credential hashing error");
        Self::Internal
    }
}

impl From<UtilError> for AuthError {
    fn from(err: UtilError) -> Self {
        tracing::error!(error = %err, "Utils error");
        Self::Internal
    }
}
