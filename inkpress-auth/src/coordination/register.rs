//! Registration and email verification.

use crate::audit::{AuditEvent, AuditEventKind};
use crate::credentials::{self, validate_email, validate_password};
use crate::mail::send_with_retry;
use crate::ratelimit::{RateLimitAction, RateLimitDecision, email_ip_key, ip_key};
use crate::session::ClientInfo;
use crate::tokens::TokenPurpose;
use crate::userdb::{User, UserSearchField};

use super::{AuthEngine, AuthError};

/// Registration result.
#[derive(Debug, Clone)]
pub struct Registered {
    pub user_id: String,
}

impl AuthEngine {
    /// Create a password account. Registration is throttled per network
    /// address alone since the attacker controls the email field.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirmation: &str,
        client: &ClientInfo,
    ) -> Result<Registered, AuthError> {
        if let RateLimitDecision::Limited { retry_after } = self
            .rate_limiter
            .check(RateLimitAction::Register, &ip_key(&client.ip_address))
            .await?
        {
            return Err(AuthError::RateLimited { retry_after }.log());
        }

        if password != confirmation {
            return Err(AuthError::Validation("Passwords do not match".to_string()).log());
        }
        validate_email(email).map_err(AuthError::Validation)?;
        validate_password(password).map_err(AuthError::Validation)?;

        let email = email.to_lowercase();
        let password_hash = credentials::hash_password(password)?;

        let mut user = User::new(
            self.gen_new_user_id().await?,
            Some(email.clone()),
            // Default display name: the mailbox half of the address
            email.split('@').next().unwrap_or("member").to_string(),
        );
        user.password_hash = Some(password_hash);
        user.is_admin = self.is_admin_email(&email);

        // A duplicate email surfaces as Conflict here; reporting it is
        // operationally necessary for a registration form.
        let user = self.users.upsert_user(user).await?;

        self.send_verification_email(&user, client).await?;

        self.audit
            .record(AuditEvent::new(AuditEventKind::Registered, client).user(&user.id))
            .await;

        Ok(Registered { user_id: user.id })
    }

    /// Complete email verification by consuming the mailed token.
    pub async fn verify_email(&self, token: &str, client: &ClientInfo) -> Result<(), AuthError> {
        let validated = self
            .tokens
            .validate(token, TokenPurpose::EmailVerification)
            .await?;

        self.users.mark_email_verified(&validated.user_id).await?;
        self.tokens.mark_used(&validated.token_id).await?;

        self.audit
            .record(AuditEvent::new(AuditEventKind::EmailVerified, client).user(&validated.user_id))
            .await;

        Ok(())
    }

    /// Re-send the verification email. Succeeds without sending for unknown
    /// or already-verified addresses, so the response leaks nothing.
    pub async fn resend_email_verification(
        &self,
        email: &str,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        let rate_key = email_ip_key(email, &client.ip_address);
        if let RateLimitDecision::Limited { retry_after } = self
            .rate_limiter
            .check(RateLimitAction::ResendVerification, &rate_key)
            .await?
        {
            return Err(AuthError::RateLimited { retry_after }.log());
        }

        let user = self
            .users
            .get_user_by(UserSearchField::Email(email.to_lowercase()))
            .await?;

        match user {
            Some(user) if !user.email_verified => {
                self.send_verification_email(&user, client).await?;
            }
            _ => {
                tracing::debug!("Verification resend for unknown or verified email; no-op");
            }
        }

        Ok(())
    }

    pub(super) async fn send_verification_email(
        &self,
        user: &User,
        client: &ClientInfo,
    ) -> Result<(), AuthError> {
        let Some(email) = user.email.as_deref() else {
            tracing::error!(user_id = %user.id, "Cannot send verification mail without email");
            return Err(AuthError::Internal);
        };

        let issued = self
            .tokens
            .create(
                &user.id,
                TokenPurpose::EmailVerification,
                self.config.verification_token_ttl,
            )
            .await?;

        send_with_retry(
            self.mailer.as_ref(),
            email,
            "Verify your email address",
            &format!(
                "<p>Confirm your address with this code: <code>{}</code></p>",
                issued.token
            ),
            self.config.mail_timeout,
            self.config.mail_retries,
        )
        .await?;

        self.audit
            .record(
                AuditEvent::new(AuditEventKind::EmailVerificationRequested, client)
                    .user(&user.id),
            )
            .await;

        Ok(())
    }
}
