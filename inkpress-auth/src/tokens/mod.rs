//! Single-use, short-lived capability tokens: password reset and email
//! verification.
//!
//! The value handed to the user is `{id}.{secret}`; only a SHA-256 digest of
//! the secret half is stored. `validate` checks digest, expiry and the used
//! flag but does not consume the token — callers validate, perform the
//! downstream change, and only then `mark_used`, so a failed downstream step
//! never burns the token. After `mark_used`, `validate` always fails.

mod storage;
mod types;

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::storage::DataStore;
use crate::utils::{base64url_encode, gen_random_string};

pub use storage::TokenStore;
pub use types::{OneTimeToken, TokenError, TokenPurpose};

/// A freshly created token: the wire value plus its row id.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: String,
}

/// Outcome of a successful `validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedToken {
    pub token_id: String,
    pub user_id: String,
}

fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    base64url_encode(hasher.finalize().to_vec())
}

#[derive(Clone)]
pub struct TokenService {
    store: TokenStore,
}

impl TokenService {
    pub fn new(store: DataStore) -> Self {
        Self {
            store: TokenStore::new(store),
        }
    }

    pub async fn init(&self) -> Result<(), TokenError> {
        self.store.init().await
    }

    /// Issue a token for `user_id` with the given purpose and lifetime.
    pub async fn create(
        &self,
        user_id: &str,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let token_id = gen_random_string(16)?;
        let secret = gen_random_string(32)?;
        let now = Utc::now();

        let record = OneTimeToken {
            id: token_id.clone(),
            user_id: user_id.to_string(),
            purpose: purpose.as_str().to_string(),
            token_hash: digest(&secret),
            expires_at: now + ttl,
            used: false,
            created_at: now,
        };
        self.store.insert_token(&record).await?;

        Ok(IssuedToken {
            token: format!("{token_id}.{secret}"),
            token_id,
        })
    }

    /// Check a presented token without consuming it.
    pub async fn validate(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<ValidatedToken, TokenError> {
        let (token_id, secret) = token.split_once('.').ok_or(TokenError::Invalid)?;

        let record = self
            .store
            .get_token(token_id, purpose.as_str())
            .await?
            .ok_or(TokenError::Invalid)?;

        let expected = record.token_hash.as_bytes();
        if !bool::from(expected.ct_eq(digest(secret).as_bytes())) {
            return Err(TokenError::Invalid);
        }

        if record.used || record.expires_at <= Utc::now() {
            return Err(TokenError::ExpiredOrUsed);
        }

        Ok(ValidatedToken {
            token_id: record.id,
            user_id: record.user_id,
        })
    }

    /// Permanently consume a token. Idempotent: marking an already-used
    /// token is a no-op, but any later `validate` fails.
    pub async fn mark_used(&self, token_id: &str) -> Result<(), TokenError> {
        self.store.mark_used(token_id).await
    }

    /// Sweeper helper: drop tokens that expired before `cutoff`.
    pub(crate) async fn delete_expired_before(
        &self,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<u64, TokenError> {
        self.store.delete_expired_before(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> TokenService {
        let store = DataStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let service = TokenService::new(store);
        service.init().await.expect("init");
        service
    }

    #[tokio::test]
    async fn test_create_validate_roundtrip() {
        let service = service().await;
        let issued = service
            .create("u1", TokenPurpose::PasswordReset, Duration::hours(1))
            .await
            .expect("create");

        let validated = service
            .validate(&issued.token, TokenPurpose::PasswordReset)
            .await
            .expect("validate");
        assert_eq!(validated.user_id, "u1");
        assert_eq!(validated.token_id, issued.token_id);
    }

    #[tokio::test]
    async fn test_validate_is_not_consuming() {
        let service = service().await;
        let issued = service
            .create("u1", TokenPurpose::PasswordReset, Duration::hours(1))
            .await
            .expect("create");

        service
            .validate(&issued.token, TokenPurpose::PasswordReset)
            .await
            .expect("first validate");
        service
            .validate(&issued.token, TokenPurpose::PasswordReset)
            .await
            .expect("second validate");
    }

    #[tokio::test]
    async fn test_mark_used_is_permanent_and_idempotent() {
        let service = service().await;
        let issued = service
            .create("u1", TokenPurpose::PasswordReset, Duration::hours(1))
            .await
            .expect("create");

        service.mark_used(&issued.token_id).await.expect("mark");
        service
            .mark_used(&issued.token_id)
            .await
            .expect("mark again");

        let result = service
            .validate(&issued.token, TokenPurpose::PasswordReset)
            .await;
        assert!(matches!(result, Err(TokenError::ExpiredOrUsed)));
    }

    #[tokio::test]
    async fn test_expired_token_rejected_even_if_unused() {
        let service = service().await;
        let issued = service
            .create("u1", TokenPurpose::PasswordReset, Duration::seconds(-1))
            .await
            .expect("create");

        let result = service
            .validate(&issued.token, TokenPurpose::PasswordReset)
            .await;
        assert!(matches!(result, Err(TokenError::ExpiredOrUsed)));
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected_without_leaking_state() {
        let service = service().await;
        let issued = service
            .create("u1", TokenPurpose::PasswordReset, Duration::hours(1))
            .await
            .expect("create");

        let forged = format!("{}.{}", issued.token_id, "wrong-secret");
        let result = service.validate(&forged, TokenPurpose::PasswordReset).await;
        assert!(matches!(result, Err(TokenError::Invalid)));
    }

    #[tokio::test]
    async fn test_purposes_do_not_cross() {
        let service = service().await;
        let issued = service
            .create("u1", TokenPurpose::PasswordReset, Duration::hours(1))
            .await
            .expect("create");

        let result = service
            .validate(&issued.token, TokenPurpose::EmailVerification)
            .await;
        assert!(matches!(result, Err(TokenError::Invalid)));
    }

    #[tokio::test]
    async fn test_malformed_token_rejected() {
        let service = service().await;
        let result = service.validate("no-dot", TokenPurpose::PasswordReset).await;
        assert!(matches!(result, Err(TokenError::Invalid)));
    }
}
