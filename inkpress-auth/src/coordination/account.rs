//! Signed-in account management: profile updates and soft deletion.

use http::HeaderMap;

use crate::audit::{AuditEvent, AuditEventKind};
use crate::session::{ClientInfo, RevocationReason};
use crate::userdb::User;

use super::{AuthEngine, AuthError};

impl AuthEngine {
    /// Update the display name and/or avatar of the signed-in user.
    pub async fn update_profile(
        &self,
        session_id: &str,
        label: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<User, AuthError> {
        let user = self.require_session_user(session_id).await?;

        let updated = User {
            label: label.unwrap_or(user.label.clone()),
            avatar_url: avatar_url.or(user.avatar_url.clone()),
            ..user
        };

        Ok(self.users.upsert_user(updated).await?)
    }

    /// Soft-delete the signed-in account: personal fields are nulled and the
    /// display name tombstoned, keeping authored content referentially
    /// intact. Every session family is revoked and the cookies cleared.
    pub async fn delete_account(
        &self,
        session_id: &str,
        client: &ClientInfo,
    ) -> Result<HeaderMap, AuthError> {
        let user = self.require_session_user(session_id).await?;

        self.rotation
            .store()
            .revoke_all_for_user(&user.id, RevocationReason::AccountDeleted)
            .await?;
        self.users.soft_delete_user(&user.id).await?;

        self.audit
            .record(AuditEvent::new(AuditEventKind::AccountDeleted, client).user(&user.id))
            .await;

        self.cleared_cookies()
    }
}
