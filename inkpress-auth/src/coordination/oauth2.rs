//! Third-party sign-in: consume an authorization code, link or create the
//! local account, start a session family.

use crate::audit::{AuditEvent, AuditEventKind};
use crate::session::ClientInfo;
use crate::userdb::{User, UserSearchField};

use super::{AuthEngine, AuthError, Authenticated};

impl AuthEngine {
    /// Handle a provider callback. Accounts are linked by verified email
    /// match; first sight of an email creates the account with the
    /// provider's verification status. OAuth sessions are long-lived
    /// (remembered) since the provider handles re-authentication.
    pub async fn oauth_callback(
        &self,
        provider: &str,
        code: &str,
        client: &ClientInfo,
    ) -> Result<Authenticated, AuthError> {
        let oauth_client = match provider {
            "google" => self.oauth_google.as_ref(),
            _ => None,
        }
        .ok_or_else(|| {
            AuthError::Validation(format!("Unknown or unconfigured provider: {provider}")).log()
        })?;

        let token_response = oauth_client.exchange_code(code).await?;
        let user_info = oauth_client
            .fetch_user_info(&token_response.access_token)
            .await?;

        let email = user_info.email.to_lowercase();
        let user = match self
            .users
            .get_user_by(UserSearchField::Email(email.clone()))
            .await?
        {
            Some(mut existing) => {
                if existing.provider.as_deref() != Some(provider) {
                    existing.provider = Some(provider.to_string());
                    existing = self.users.upsert_user(existing).await?;
                }
                existing
            }
            None => {
                let mut user = User::new(
                    self.gen_new_user_id().await?,
                    Some(email.clone()),
                    user_info.name.clone(),
                );
                user.provider = Some(provider.to_string());
                user.avatar_url = user_info.picture.clone();
                user.email_verified = user_info.verified_email;
                user.is_admin = self.is_admin_email(&email);
                self.users.upsert_user(user).await?
            }
        };

        // Any successful authentication resets the lockout state.
        self.lockout.record_success(&user.id).await?;

        let session = self.rotation.create_session(&user.id, true, client).await?;
        let response = self.issue_session_response(&session)?;

        self.audit
            .record(
                AuditEvent::new(AuditEventKind::OAuthSignIn, client)
                    .user(&user.id)
                    .detail(serde_json::json!({"provider": provider})),
            )
            .await;

        Ok(response)
    }
}
