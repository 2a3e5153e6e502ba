//! Session refresh: the single-use rotation exchange.

use crate::audit::{AuditEvent, AuditEventKind};
use crate::session::{ClientInfo, SessionError};

use super::{AuthEngine, AuthError, Authenticated};

impl AuthEngine {
    /// Exchange a presented session credential for its successor.
    ///
    /// A stale credential triggers family-wide revocation; the distinct
    /// internal classification is audited at high severity but the caller
    /// only ever sees `SessionInvalid`, the same answer an expired or
    /// unknown session gets.
    pub async fn refresh(
        &self,
        presented_session_id: &str,
        client: &ClientInfo,
    ) -> Result<Authenticated, AuthError> {
        match self
            .rotation
            .validate_and_rotate(presented_session_id, client)
            .await
        {
            Ok(child) => {
                let response = self.issue_session_response(&child)?;

                self.audit
                    .record(
                        AuditEvent::new(AuditEventKind::SessionRotated, client)
                            .user(&child.user_id)
                            .detail(serde_json::json!({
                                "family_id": child.family_id,
                                "rotation_count": child.rotation_count,
                            })),
                    )
                    .await;

                // Opportunistic garbage collection; the refresh succeeded
                // regardless of how this goes.
                self.sweep_after_refresh().await;

                Ok(response)
            }
            Err(SessionError::ReuseDetected {
                family_id,
                rotation_count,
            }) => {
                self.audit
                    .record(
                        AuditEvent::new(AuditEventKind::SessionReuseDetected, client)
                            .detail(serde_json::json!({
                                "family_id": family_id,
                                "rotation_count": rotation_count,
                            }))
                            .failure(),
                    )
                    .await;
                Err(AuthError::SessionInvalid.log())
            }
            Err(e) => Err(e.into()),
        }
    }
}
