//! Best-effort garbage collection of expired auth state.
//!
//! Invoked opportunistically after routine operations (a successful refresh)
//! rather than on a timer, since the runtime may not guarantee background
//! scheduling. Every statement is an unconditional DELETE with a cutoff, so
//! concurrent invocations are safe and skipping a sweep costs nothing but
//! disk.

use chrono::Utc;

use super::{AuthEngine, AuthError};

/// What one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupCounts {
    /// Sessions past expiry plus the grace window
    pub expired_sessions: u64,
    /// Revoked sessions past the retention window
    pub revoked_sessions: u64,
    /// One-time tokens past expiry
    pub expired_tokens: u64,
    /// Rate-limit buckets whose window is long gone
    pub stale_rate_limit_buckets: u64,
}

impl AuthEngine {
    /// Delete expired and long-revoked auth state. Safe to call
    /// concurrently; not required for correctness.
    pub async fn cleanup_expired(&self) -> Result<CleanupCounts, AuthError> {
        let now = Utc::now();

        let expired_sessions = self
            .rotation
            .store()
            .delete_expired_before(now - self.config.session_cleanup_grace)
            .await?;
        let revoked_sessions = self
            .rotation
            .store()
            .delete_revoked_before(now - self.config.revoked_session_retention)
            .await?;
        let expired_tokens = self.tokens.delete_expired_before(now).await?;
        let stale_rate_limit_buckets = self
            .rate_limiter
            .delete_stale(now - self.rate_limiter.max_window())
            .await?;

        let counts = CleanupCounts {
            expired_sessions,
            revoked_sessions,
            expired_tokens,
            stale_rate_limit_buckets,
        };

        if counts != CleanupCounts::default() {
            tracing::debug!(
                expired_sessions = counts.expired_sessions,
                revoked_sessions = counts.revoked_sessions,
                expired_tokens = counts.expired_tokens,
                stale_rate_limit_buckets = counts.stale_rate_limit_buckets,
                "Cleanup sweep completed"
            );
        }

        Ok(counts)
    }

    /// Sweep after a successful refresh; failures are logged and swallowed.
    pub(crate) async fn sweep_after_refresh(&self) {
        if let Err(e) = self.cleanup_expired().await {
            tracing::warn!(error = %e, "Opportunistic cleanup sweep failed; continuing");
        }
    }
}
