//! Append-only audit trail of security-relevant events.
//!
//! [`AuditLog::record`] is fire-and-forget: a storage failure is logged
//! locally and swallowed, never propagated into the security decision path.
//! There are no update or delete operations on audit rows.

mod storage;
mod types;

use crate::storage::DataStore;

pub use storage::AuditStore;
pub use types::{AuditError, AuditEvent, AuditEventKind, StoredAuditEvent};

#[derive(Clone)]
pub struct AuditLog {
    store: AuditStore,
}

impl AuditLog {
    pub fn new(store: DataStore) -> Self {
        Self {
            store: AuditStore::new(store),
        }
    }

    pub async fn init(&self) -> Result<(), AuditError> {
        self.store.init().await
    }

    /// Record an event. Never fails from the caller's perspective.
    pub async fn record(&self, event: AuditEvent) {
        if let Err(e) = self.store.insert_event(&event).await {
            tracing::warn!(
                error = %e,
                kind = %event.kind,
                "Failed to write audit event; continuing"
            );
        }
    }

    /// Most recent events, newest first. Read-side helper for admin tooling
    /// and tests.
    pub async fn recent(&self, limit: i64) -> Result<Vec<StoredAuditEvent>, AuditError> {
        self.store.recent(limit).await
    }

    /// Most recent events for one user, newest first.
    pub async fn events_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredAuditEvent>, AuditError> {
        self.store.events_for_user(user_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ClientInfo;

    async fn log() -> AuditLog {
        let store = DataStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let log = AuditLog::new(store);
        log.init().await.expect("init");
        log
    }

    fn client() -> ClientInfo {
        ClientInfo::new("10.0.0.1", "test-agent")
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let log = log().await;

        log.record(
            AuditEvent::new(AuditEventKind::LoginSucceeded, &client())
                .user("u1")
                .detail(serde_json::json!({"remember_me": true})),
        )
        .await;
        log.record(
            AuditEvent::new(AuditEventKind::LoginFailed, &client())
                .user("u1")
                .failure(),
        )
        .await;

        let events = log.events_for_user("u1", 10).await.expect("read");
        assert_eq!(events.len(), 2);
        // Newest first
        assert_eq!(events[0].kind, "login_failed");
        assert!(!events[0].success);
        assert_eq!(events[1].kind, "login_succeeded");
        assert!(events[1].success);
        assert_eq!(events[1].ip_address, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_events_without_user_are_recorded() {
        let log = log().await;
        log.record(AuditEvent::new(AuditEventKind::LoginFailed, &client()).failure())
            .await;

        let events = log.recent(10).await.expect("read");
        assert_eq!(events.len(), 1);
        assert!(events[0].user_id.is_none());
    }

    #[tokio::test]
    async fn test_record_swallows_storage_failure() {
        // A log whose table was never created: every insert fails
        let store = DataStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let log = AuditLog::new(store);

        // Must not panic or error
        log.record(AuditEvent::new(AuditEventKind::SignedOut, &client())).await;
    }
}
