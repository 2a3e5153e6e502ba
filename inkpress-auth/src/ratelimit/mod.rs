//! Server-side rate limiting for sensitive actions.
//!
//! Fixed-window counters live in the shared relational store, keyed by
//! (action, compound identity). The increment-and-compare is a single
//! statement so two parallel requests can never both slip past the ceiling.
//! Client-visible state plays no part in any decision here.

mod storage;
mod types;

use chrono::Utc;

use crate::config::{AuthConfig, RateLimitPolicy};
use crate::storage::DataStore;

pub use storage::RateLimitStore;
pub use types::{RateLimitAction, RateLimitDecision, RateLimitError};

/// Compound key for actions throttled per email and network address.
pub fn email_ip_key(email: &str, ip_address: &str) -> String {
    format!("{}|{}", email.to_lowercase(), ip_address)
}

/// Key for actions throttled per network address alone.
pub fn ip_key(ip_address: &str) -> String {
    ip_address.to_string()
}

#[derive(Clone)]
pub struct RateLimiter {
    store: RateLimitStore,
    login: RateLimitPolicy,
    register: RateLimitPolicy,
    password_reset: RateLimitPolicy,
    resend_verification: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(store: DataStore, config: &AuthConfig) -> Self {
        Self {
            store: RateLimitStore::new(store),
            login: config.rate_limit_login,
            register: config.rate_limit_register,
            password_reset: config.rate_limit_password_reset,
            resend_verification: config.rate_limit_resend_verification,
        }
    }

    pub async fn init(&self) -> Result<(), RateLimitError> {
        self.store.init().await
    }

    fn policy(&self, action: RateLimitAction) -> RateLimitPolicy {
        match action {
            RateLimitAction::Login => self.login,
            RateLimitAction::Register => self.register,
            RateLimitAction::PasswordReset => self.password_reset,
            RateLimitAction::ResendVerification => self.resend_verification,
        }
    }

    /// Longest configured window; stale buckets older than this are garbage.
    pub(crate) fn max_window(&self) -> chrono::Duration {
        [
            self.login.window,
            self.register.window,
            self.password_reset.window,
            self.resend_verification.window,
        ]
        .into_iter()
        .max()
        .expect("there is at least one policy")
    }

    /// Count one attempt against the bucket and return the verdict.
    ///
    /// An attempt over the ceiling is rejected and not counted further; the
    /// verdict carries the time until the current window expires.
    pub async fn check(
        &self,
        action: RateLimitAction,
        key: &str,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let policy = self.policy(action);
        let now = Utc::now();

        let (count, window_start) = self
            .store
            .increment(action, key, now, policy.window, policy.max_attempts)
            .await?;

        if count > i64::from(policy.max_attempts) {
            let retry_after = (window_start + policy.window) - now;
            let retry_after = retry_after.max(chrono::Duration::zero());
            tracing::debug!(
                action = %action,
                key = %key,
                retry_after_secs = retry_after.num_seconds(),
                "Rate limit exceeded"
            );
            return Ok(RateLimitDecision::Limited { retry_after });
        }

        Ok(RateLimitDecision::Allowed)
    }

    /// Drop the bucket for an identity. Called after a successful login so a
    /// run of failures followed by success does not leave the user throttled.
    pub async fn reset(&self, action: RateLimitAction, key: &str) -> Result<(), RateLimitError> {
        self.store.reset(action, key).await
    }

    /// Delete buckets whose window ended before `cutoff`. Sweeper helper.
    pub(crate) async fn delete_stale(
        &self,
        cutoff: chrono::DateTime<Utc>,
    ) -> Result<u64, RateLimitError> {
        self.store.delete_stale(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn limiter(max_attempts: u32, window: Duration) -> RateLimiter {
        let store = DataStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let config = AuthConfig {
            rate_limit_login: RateLimitPolicy::new(max_attempts, window),
            ..AuthConfig::default()
        };
        let limiter = RateLimiter::new(store, &config);
        limiter.init().await.expect("init");
        limiter
    }

    #[tokio::test]
    async fn test_allows_up_to_ceiling_then_rejects() {
        let limiter = limiter(3, Duration::minutes(10)).await;
        let key = email_ip_key("User@Example.com", "10.0.0.1");

        for _ in 0..3 {
            let decision = limiter
                .check(RateLimitAction::Login, &key)
                .await
                .expect("check");
            assert_eq!(decision, RateLimitDecision::Allowed);
        }

        match limiter
            .check(RateLimitAction::Login, &key)
            .await
            .expect("check")
        {
            RateLimitDecision::Limited { retry_after } => {
                assert!(retry_after > Duration::zero());
                assert!(retry_after <= Duration::minutes(10));
            }
            RateLimitDecision::Allowed => panic!("expected limit"),
        }
    }

    #[tokio::test]
    async fn test_rejected_attempts_do_not_extend_the_count() {
        let limiter = limiter(2, Duration::minutes(10)).await;
        let key = ip_key("10.0.0.2");

        for _ in 0..2 {
            limiter
                .check(RateLimitAction::Login, &key)
                .await
                .expect("check");
        }
        // Hammer past the ceiling; the stored count must stay pinned at the
        // rejection sentinel instead of growing.
        for _ in 0..5 {
            assert!(matches!(
                limiter
                    .check(RateLimitAction::Login, &key)
                    .await
                    .expect("check"),
                RateLimitDecision::Limited { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_reset_clears_the_bucket() {
        let limiter = limiter(1, Duration::minutes(10)).await;
        let key = email_ip_key("a@b.com", "10.0.0.3");

        limiter
            .check(RateLimitAction::Login, &key)
            .await
            .expect("check");
        assert!(matches!(
            limiter
                .check(RateLimitAction::Login, &key)
                .await
                .expect("check"),
            RateLimitDecision::Limited { .. }
        ));

        limiter
            .reset(RateLimitAction::Login, &key)
            .await
            .expect("reset");

        assert_eq!(
            limiter
                .check(RateLimitAction::Login, &key)
                .await
                .expect("check"),
            RateLimitDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_expired_window_starts_fresh() {
        let limiter = limiter(1, Duration::zero()).await;
        let key = ip_key("10.0.0.4");

        // With a zero-length window every attempt lands in a fresh window.
        for _ in 0..3 {
            assert_eq!(
                limiter
                    .check(RateLimitAction::Login, &key)
                    .await
                    .expect("check"),
                RateLimitDecision::Allowed
            );
        }
    }

    #[tokio::test]
    async fn test_keys_are_isolated_per_action_and_identity() {
        let limiter = limiter(1, Duration::minutes(10)).await;

        limiter
            .check(RateLimitAction::Login, "a@b.com|10.0.0.5")
            .await
            .expect("check");

        // Different identity, same action
        assert_eq!(
            limiter
                .check(RateLimitAction::Login, "other@b.com|10.0.0.5")
                .await
                .expect("check"),
            RateLimitDecision::Allowed
        );
        // Same identity, different action
        assert_eq!(
            limiter
                .check(RateLimitAction::PasswordReset, "a@b.com|10.0.0.5")
                .await
                .expect("check"),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn test_email_ip_key_normalizes_case() {
        assert_eq!(
            email_ip_key("User@Example.com", "10.0.0.1"),
            "user@example.com|10.0.0.1"
        );
    }
}
