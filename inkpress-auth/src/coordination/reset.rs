//! Password reset: request and completion.

use crate::audit::{AuditEvent, AuditEventKind};
use crate::credentials::{self, validate_password};
use crate::mail::send_with_retry;
use crate::ratelimit::{RateLimitAction, RateLimitDecision, email_ip_key};
use crate::session::{ClientInfo, RevocationReason};
use crate::tokens::TokenPurpose;
use crate::userdb::UserSearchField;

use super::{AuthEngine, AuthError};

impl AuthEngine {
    /// Issue a single-use reset token and mail it. Unknown emails return
    /// success without sending, so the response does not reveal whether an
    /// address is registered.
    pub async fn request_password_reset(
        &self,
        email: &str,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        let rate_key = email_ip_key(email, &client.ip_address);
        if let RateLimitDecision::Limited { retry_after } = self
            .rate_limiter
            .check(RateLimitAction::PasswordReset, &rate_key)
            .await?
        {
            return Err(AuthError::RateLimited { retry_after }.log());
        }

        let Some(user) = self
            .users
            .get_user_by(UserSearchField::Email(email.to_lowercase()))
            .await?
        else {
            tracing::debug!("Password reset requested for unknown email; no-op");
            return Ok(());
        };

        let issued = self
            .tokens
            .create(
                &user.id,
                TokenPurpose::PasswordReset,
                self.config.reset_token_ttl,
            )
            .await?;

        send_with_retry(
            self.mailer.as_ref(),
            email,
            "Reset your password",
            &format!(
                "<p>Use this code to reset your password: <code>{}</code></p>",
                issued.token
            ),
            self.config.mail_timeout,
            self.config.mail_retries,
        )
        .await?;

        self.audit
            .record(
                AuditEvent::new(AuditEventKind::PasswordResetRequested, client).user(&user.id),
            )
            .await;

        Ok(())
    }

    /// Complete a reset. The token is validated first and only marked used
    /// after the new password hash has landed, so a failed store write never
    /// burns the token. Completion clears the lockout state and revokes
    /// every outstanding session family for the account.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirmation: &str,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        if new_password != confirmation {
            return Err(AuthError::Validation("Passwords do not match".to_string()).log());
        }
        validate_password(new_password).map_err(AuthError::Validation)?;

        let validated = self
            .tokens
            .validate(token, TokenPurpose::PasswordReset)
            .await?;

        let password_hash = credentials::hash_password(new_password)?;
        self.users
            .set_password_hash(&validated.user_id, &password_hash)
            .await?;

        self.tokens.mark_used(&validated.token_id).await?;

        // Proving control of the mailbox counts as a successful
        // authentication: the failure counter resets and the lock clears.
        self.lockout.record_success(&validated.user_id).await?;

        // A reset usually means the old password (and possibly cookies) are
        // compromised; force every device to re-authenticate.
        self.rotation
            .store()
            .revoke_all_for_user(&validated.user_id, RevocationReason::PasswordReset)
            .await?;

        self.audit
            .record(
                AuditEvent::new(AuditEventKind::PasswordResetCompleted, client)
                    .user(&validated.user_id),
            )
            .await;

        Ok(())
    }
}
