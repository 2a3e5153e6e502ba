//! Password login and sign-out.

use chrono::Utc;
use http::HeaderMap;

use crate::audit::{AuditEvent, AuditEventKind};
use crate::credentials;
use crate::lockout::LockoutStatus;
use crate::ratelimit::{RateLimitAction, RateLimitDecision, email_ip_key};
use crate::session::ClientInfo;
use crate::userdb::UserSearchField;

use super::{AuthEngine, AuthError, Authenticated};

impl AuthEngine {
    /// Authenticate with email and password, starting a fresh session
    /// family on success.
    ///
    /// Order of checks: rate limit, constant-shape credential verification,
    /// lockout state, then the credential verdict. A locked account answers
    /// `AccountLocked` even when the password is correct, so the lock is
    /// observable to the legitimate owner without aiding a guesser.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
        client: &ClientInfo,
    ) -> Result<Authenticated, AuthError> {
        let rate_key = email_ip_key(email, &client.ip_address);
        if let RateLimitDecision::Limited { retry_after } = self
            .rate_limiter
            .check(RateLimitAction::Login, &rate_key)
            .await?
        {
            self.audit
                .record(
                    AuditEvent::new(AuditEventKind::LoginFailed, client)
                        .detail(serde_json::json!({"reason": "rate_limited"}))
                        .failure(),
                )
                .await;
            return Err(AuthError::RateLimited { retry_after }.log());
        }

        let user = self
            .users
            .get_user_by(UserSearchField::Email(email.to_lowercase()))
            .await?;

        // Runs a full hash comparison whether or not the lookup hit, so the
        // miss path costs the same as the hit path.
        let stored_hash = user.as_ref().and_then(|u| u.password_hash.as_deref());
        let password_matches = credentials::verify_password(password, stored_hash);

        let Some(user) = user else {
            self.audit
                .record(
                    AuditEvent::new(AuditEventKind::LoginFailed, client)
                        .detail(serde_json::json!({"reason": "unknown_email"}))
                        .failure(),
                )
                .await;
            return Err(AuthError::InvalidCredentials.log());
        };

        if let LockoutStatus::Locked { remaining } = self.lockout.status(&user, Utc::now()) {
            self.audit
                .record(
                    AuditEvent::new(AuditEventKind::LoginFailed, client)
                        .user(&user.id)
                        .detail(serde_json::json!({"reason": "locked"}))
                        .failure(),
                )
                .await;
            return Err(AuthError::AccountLocked { remaining }.log());
        }

        if !password_matches {
            let outcome = self.lockout.record_failure(&user.id).await?;
            if outcome.lock_tripped {
                self.audit
                    .record(
                        AuditEvent::new(AuditEventKind::LockoutTriggered, client)
                            .user(&user.id)
                            .detail(serde_json::json!({
                                "failed_attempts": outcome.failed_attempts,
                            }))
                            .failure(),
                    )
                    .await;
            }
            self.audit
                .record(
                    AuditEvent::new(AuditEventKind::LoginFailed, client)
                        .user(&user.id)
                        .detail(serde_json::json!({"reason": "bad_password"}))
                        .failure(),
                )
                .await;
            return Err(AuthError::InvalidCredentials.log());
        }

        self.lockout.record_success(&user.id).await?;
        // Legitimate failures followed by success must not leave the user
        // throttled; the reset itself is best-effort.
        if let Err(e) = self
            .rate_limiter
            .reset(RateLimitAction::Login, &rate_key)
            .await
        {
            tracing::warn!(error = %e, "Failed to reset login rate limit bucket");
        }

        let session = self
            .rotation
            .create_session(&user.id, remember_me, client)
            .await?;
        let response = self.issue_session_response(&session)?;

        self.audit
            .record(
                AuditEvent::new(AuditEventKind::LoginSucceeded, client)
                    .user(&user.id)
                    .detail(serde_json::json!({"remember_me": remember_me})),
            )
            .await;

        Ok(response)
    }

    /// Explicit sign-out. Revokes the whole family containing the presented
    /// session — every device sharing that login lineage is signed out — and
    /// returns cookie-clearing headers. Idempotent for unknown sessions.
    pub async fn sign_out(
        &self,
        session_id: &str,
        client: &ClientInfo,
    ) -> Result<HeaderMap, AuthError> {
        let session = self.rotation.store().get_session(session_id).await?;
        self.rotation.invalidate(session_id).await?;

        let mut event = AuditEvent::new(AuditEventKind::SignedOut, client);
        if let Some(session) = session {
            event = event.user(&session.user_id);
        }
        self.audit.record(event).await;

        self.cleared_cookies()
    }
}
