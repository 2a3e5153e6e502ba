//! The session rotation state machine.
//!
//! Every refresh credential is single-use: a successful refresh marks the
//! presented row Rotated and issues exactly one Active child in the same
//! family. Presenting an already-rotated credential is the breach condition —
//! whether it is an attacker replaying a stolen cookie or a client retrying a
//! request whose response was lost cannot be distinguished from session state
//! alone, so both revoke the entire family and force re-authentication.

use chrono::Utc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::utils::gen_random_string;

use super::errors::SessionError;
use super::storage::SessionStore;
use super::types::{ClientInfo, RevocationReason, Session};

#[derive(Clone)]
pub struct RotationEngine {
    sessions: SessionStore,
    session_ttl: chrono::Duration,
    session_ttl_remembered: chrono::Duration,
    max_rotations: u32,
}

impl RotationEngine {
    pub fn new(sessions: SessionStore, config: &AuthConfig) -> Self {
        Self {
            sessions,
            session_ttl: config.session_ttl,
            session_ttl_remembered: config.session_ttl_remembered,
            max_rotations: config.session_max_rotations,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.sessions
    }

    fn ttl_for(&self, remembered: bool) -> chrono::Duration {
        if remembered {
            self.session_ttl_remembered
        } else {
            self.session_ttl
        }
    }

    /// Start a new rotation family for a freshly authenticated user.
    pub async fn create_session(
        &self,
        user_id: &str,
        remember_me: bool,
        client: &ClientInfo,
    ) -> Result<Session, SessionError> {
        let now = Utc::now();
        let session = Session {
            id: gen_random_string(32)?,
            user_id: user_id.to_string(),
            family_id: Uuid::new_v4().to_string(),
            rotation_count: 0,
            remembered: remember_me,
            expires_at: now + self.ttl_for(remember_me),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            rotated: false,
            revoked: false,
            revoked_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.sessions.insert_session(&session).await?;
        tracing::debug!(
            user_id = %user_id,
            family_id = %session.family_id,
            remembered = remember_me,
            "Session family created"
        );
        Ok(session)
    }

    /// Validate a presented session credential and rotate it.
    ///
    /// Exactly one caller can consume an Active row; everyone else lands on
    /// the reuse path. The returned child is the only Active member of the
    /// family afterwards.
    pub async fn validate_and_rotate(
        &self,
        presented_id: &str,
        client: &ClientInfo,
    ) -> Result<Session, SessionError> {
        let now = Utc::now();

        let session = self
            .sessions
            .get_session(presented_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        if session.revoked {
            return Err(SessionError::Revoked);
        }

        if session.is_expired(now) {
            return Err(SessionError::Expired);
        }

        if session.rotated {
            return self.handle_reuse(&session).await;
        }

        if session.rotation_count + 1 > i64::from(self.max_rotations) {
            self.sessions
                .revoke_family(&session.family_id, RevocationReason::RotationLimit)
                .await?;
            return Err(SessionError::RotationLimit {
                family_id: session.family_id,
            });
        }

        if !self.sessions.mark_rotated(&session.id).await? {
            // Lost the check-and-set. Re-read to classify: a concurrent
            // rotation takes the reuse path, anything else fails closed.
            return match self.sessions.get_session(&session.id).await? {
                Some(current) if current.rotated => self.handle_reuse(&current).await,
                Some(_) => Err(SessionError::Revoked),
                None => Err(SessionError::NotFound),
            };
        }

        let child = Session {
            id: gen_random_string(32)?,
            user_id: session.user_id.clone(),
            family_id: session.family_id.clone(),
            rotation_count: session.rotation_count + 1,
            remembered: session.remembered,
            expires_at: now + self.ttl_for(session.remembered),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            rotated: false,
            revoked: false,
            revoked_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.sessions.insert_session(&child).await?;
        tracing::debug!(
            family_id = %child.family_id,
            rotation_count = child.rotation_count,
            "Session rotated"
        );
        Ok(child)
    }

    async fn handle_reuse(&self, session: &Session) -> Result<Session, SessionError> {
        tracing::warn!(
            user_id = %session.user_id,
            family_id = %session.family_id,
            rotation_count = session.rotation_count,
            "Stale session credential presented; revoking entire family"
        );
        self.sessions
            .revoke_family(&session.family_id, RevocationReason::ReuseDetected)
            .await?;
        Err(SessionError::ReuseDetected {
            family_id: session.family_id.clone(),
            rotation_count: session.rotation_count,
        })
    }

    /// Idempotent family-wide revocation.
    pub async fn revoke_family(
        &self,
        family_id: &str,
        reason: RevocationReason,
    ) -> Result<u64, SessionError> {
        self.sessions.revoke_family(family_id, reason).await
    }

    /// Explicit sign-out: revokes the family containing `session_id`, which
    /// terminates every device sharing that login lineage. Unknown ids
    /// succeed silently so sign-out stays idempotent.
    pub async fn invalidate(&self, session_id: &str) -> Result<(), SessionError> {
        let Some(session) = self.sessions.get_session(session_id).await? else {
            return Ok(());
        };
        self.sessions
            .revoke_family(&session.family_id, RevocationReason::SignedOut)
            .await?;
        Ok(())
    }
}
