//! Email delivery seam.
//!
//! Delivery itself is an external collaborator; this crate only defines the
//! contract and the timeout-plus-bounded-retry wrapper the operations use.
//! A send that still fails after retries surfaces to the caller as a service
//! error rather than being dropped silently.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum MailError {
    /// Transient failure; the wrapper may retry
    #[error("Retryable mail failure: {0}")]
    Retryable(String),

    /// Failure that retrying cannot fix (bad address, rejected content)
    #[error("Permanent mail failure: {0}")]
    Permanent(String),
}

/// Opaque mail collaborator: `send(to, subject, html)`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Mailer that drops everything. For tests and mail-less deployments.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), MailError> {
        tracing::debug!(to = %to, subject = %subject, "NoopMailer discarding message");
        Ok(())
    }
}

/// Send with a per-attempt timeout and bounded retries on retryable
/// failures. Permanent failures are never retried.
pub(crate) async fn send_with_retry(
    mailer: &dyn Mailer,
    to: &str,
    subject: &str,
    html: &str,
    timeout: std::time::Duration,
    retries: u32,
) -> Result<(), MailError> {
    let mut attempt = 0;
    loop {
        match tokio::time::timeout(timeout, mailer.send(to, subject, html)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(MailError::Permanent(msg))) => return Err(MailError::Permanent(msg)),
            Ok(Err(MailError::Retryable(msg))) => {
                if attempt >= retries {
                    return Err(MailError::Retryable(msg));
                }
                tracing::warn!(attempt, error = %msg, "Mail send failed; retrying");
            }
            Err(_) => {
                if attempt >= retries {
                    return Err(MailError::Retryable("Mail send timed out".to_string()));
                }
                tracing::warn!(attempt, "Mail send timed out; retrying");
            }
        }
        attempt += 1;
    }
}
