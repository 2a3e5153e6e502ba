//! inkpress-auth - the authentication-session security engine behind the
//! Inkpress publishing platform.
//!
//! This crate owns the decisions about whether a request is who it claims to
//! be and whether it may proceed: credential verification, refresh-session
//! rotation with reuse (breach) detection, per-account lockout, multi-axis
//! rate limiting, single-use password-reset and email-verification tokens,
//! double-submit CSRF issuance, and an append-only audit trail. All
//! cross-request state lives in a shared relational store (SQLite or
//! Postgres via sqlx) injected at construction; request handling is
//! stateless and safe under concurrency.
//!
//! Everything hangs off [`AuthEngine`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use inkpress_auth::{AuthConfig, AuthEngine, ClientInfo, NoopMailer};
//!
//! # async fn run() -> Result<(), inkpress_auth::AuthError> {
//! let engine = AuthEngine::connect(
//!     "sqlite:inkpress.db",
//!     AuthConfig::from_env(),
//!     Arc::new(NoopMailer),
//! )
//! .await?;
//!
//! let client = ClientInfo::new("203.0.113.7", "Mozilla/5.0");
//! let authed = engine
//!     .login("author@example.com", "correct horse 1A", true, &client)
//!     .await?;
//! let rotated = engine.refresh(&authed.session_id, &client).await?;
//! # let _ = rotated;
//! # Ok(())
//! # }
//! ```

mod audit;
mod config;
mod coordination;
mod credentials;
mod lockout;
mod mail;
mod oauth2;
mod ratelimit;
mod session;
mod storage;
mod tokens;
mod userdb;
mod utils;

pub use config::{AuthConfig, OAuth2ProviderConfig, RateLimitPolicy};
pub use coordination::{AuthEngine, AuthError, Authenticated, CleanupCounts, Registered};
pub use storage::{DataStore, StorageError};

pub use audit::{AuditEvent, AuditEventKind, AuditLog, StoredAuditEvent};
pub use credentials::{hash_password, validate_email, validate_password, verify_password};
pub use lockout::{FailureOutcome, LockoutStatus, LockoutTracker};
pub use mail::{MailError, Mailer, NoopMailer};
pub use oauth2::{OAuth2Client, OAuth2Error, OidcTokenResponse, ProviderUserInfo};
pub use ratelimit::{RateLimitAction, RateLimitDecision, RateLimiter};
pub use session::{
    ClientInfo, RevocationReason, Session, SessionError, SessionStore, get_cookie_from_headers,
    issue_csrf_token, verify_csrf_token,
};
pub use tokens::{IssuedToken, TokenError, TokenPurpose, TokenService, ValidatedToken};
pub use userdb::{DELETED_LABEL, User, UserSearchField, UserStore};
