use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Request-scoped network context recorded on sessions and audit events.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// Why a family was revoked; stored as text on each revoked row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    SignedOut,
    ReuseDetected,
    RotationLimit,
    PasswordReset,
    AccountDeleted,
}

impl RevocationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignedOut => "signed_out",
            Self::ReuseDetected => "reuse_detected",
            Self::RotationLimit => "rotation_limit",
            Self::PasswordReset => "password_reset",
            Self::AccountDeleted => "account_deleted",
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One issued refresh credential. All rows sharing a `family_id` form a
/// strict rotation chain descending from one login; at most one member of a
/// live family is unrotated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Session {
    /// Opaque credential presented by the client
    pub id: String,
    pub user_id: String,
    /// Rotation family this session belongs to
    pub family_id: String,
    /// How many rotations preceded this session within its family
    pub rotation_count: i64,
    /// Lifetime class chosen at login; children inherit it
    pub remembered: bool,
    pub expires_at: DateTime<Utc>,
    /// Originating network address
    pub ip_address: String,
    /// Originating client signature
    pub user_agent: String,
    /// Consumed by exactly one successful refresh
    pub rotated: bool,
    pub revoked: bool,
    pub revoked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A session is active while it is neither rotated nor revoked.
    pub fn is_active(&self) -> bool {
        !self.rotated && !self.revoked
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_session() -> Session {
        let now = Utc::now();
        Session {
            id: "sid".to_string(),
            user_id: "u1".to_string(),
            family_id: "fam".to_string(),
            rotation_count: 0,
            remembered: false,
            expires_at: now + Duration::hours(1),
            ip_address: "10.0.0.1".to_string(),
            user_agent: "test-agent".to_string(),
            rotated: false,
            revoked: false,
            revoked_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_excludes_rotated_and_revoked() {
        let mut session = sample_session();
        assert!(session.is_active());

        session.rotated = true;
        assert!(!session.is_active());

        session.rotated = false;
        session.revoked = true;
        assert!(!session.is_active());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let session = sample_session();
        assert!(!session.is_expired(session.expires_at - Duration::seconds(1)));
        assert!(session.is_expired(session.expires_at));
        assert!(session.is_expired(session.expires_at + Duration::seconds(1)));
    }
}
