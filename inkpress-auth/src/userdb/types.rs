use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Display name written in place of personal data when an account is deleted.
/// Rows are never hard-deleted so authored content keeps a valid owner.
pub const DELETED_LABEL: &str = "[deleted]";

/// Represents a core user identity in the system
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    /// Unique user identifier
    pub id: String,
    /// Login email; NULL once the account is soft-deleted
    pub email: Option<String>,
    /// Whether the email address has been verified
    pub email_verified: bool,
    /// Argon2 PHC string; absent for OAuth-only accounts
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Linked third-party identity provider, e.g. "google"
    pub provider: Option<String>,
    /// Display name
    pub label: String,
    /// Avatar reference
    pub avatar_url: Option<String>,
    /// Whether the user has administrator privileges
    pub is_admin: bool,
    /// Consecutive failed login attempts; reset only by a successful login
    pub failed_attempts: i64,
    /// While this is in the future the account rejects logins
    pub locked_until: Option<DateTime<Utc>>,
    /// When the user account was created
    pub created_at: DateTime<Utc>,
    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new unverified user with no credentials attached yet.
    pub fn new(id: String, email: Option<String>, label: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            email_verified: false,
            password_hash: None,
            provider: None,
            label,
            avatar_url: None,
            is_admin: false,
            failed_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the account is locked out as of `now`.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }

    /// Whether this row is a soft-deleted tombstone.
    pub fn is_deleted(&self) -> bool {
        self.email.is_none() && self.label == DELETED_LABEL
    }
}

/// Lookup key for [`crate::userdb::UserStore::get_user_by`].
#[derive(Debug, Clone)]
pub enum UserSearchField {
    Id(String),
    Email(String),
}

impl std::fmt::Display for UserSearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Email(email) => write!(f, "email={email}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn test_user_new() {
        let user = User::new(
            "user123".to_string(),
            Some("test@example.com".to_string()),
            "Test User".to_string(),
        );

        assert_eq!(user.id, "user123");
        assert_eq!(user.email.as_deref(), Some("test@example.com"));
        assert!(!user.email_verified);
        assert!(user.password_hash.is_none());
        assert!(!user.is_admin);
        assert_eq!(user.failed_attempts, 0);
        assert!(user.locked_until.is_none());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_is_locked_respects_clock() {
        let mut user = User::new("u".to_string(), None, "U".to_string());
        let now = Utc::now();

        assert!(!user.is_locked(now));

        user.locked_until = Some(now + Duration::minutes(5));
        assert!(user.is_locked(now));

        // An elapsed lock no longer counts as locked even though the column
        // still holds a value.
        user.locked_until = Some(now - Duration::seconds(1));
        assert!(!user.is_locked(now));
    }

    #[test]
    fn test_is_deleted_requires_sentinel_and_null_email() {
        let mut user = User::new("u".to_string(), None, DELETED_LABEL.to_string());
        assert!(user.is_deleted());

        user.email = Some("still@here.example".to_string());
        assert!(!user.is_deleted());
    }

    proptest! {
        #[test]
        fn test_user_serde_roundtrip_never_exposes_hash(
            id in "[a-zA-Z0-9_-]{1,64}",
            email in proptest::option::of("[a-z0-9]{1,16}@[a-z0-9]{1,16}\\.[a-z]{2,8}"),
            label in "[a-zA-Z0-9 ]{1,64}",
            hash in proptest::option::of("\\$argon2id\\$[a-zA-Z0-9+/=$,.-]{8,64}"),
        ) {
            let mut user = User::new(id, email, label);
            user.password_hash = hash;

            let serialized = serde_json::to_string(&user).expect("serialize");
            prop_assert!(!serialized.contains("password_hash"));
        }
    }
}
