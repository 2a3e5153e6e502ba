use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum OAuth2Error {
    /// Provider exchange exceeded the per-call timeout (after retries)
    #[error("Upstream provider timed out")]
    Timeout,

    /// Transport-level failure talking to the provider (after retries)
    #[error("Upstream network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status; never retried
    #[error("Upstream provider rejected the request: {0}")]
    Rejected(String),

    #[error("Serde error: {0}")]
    Serde(String),

    /// No provider credentials configured for the requested provider
    #[error("OAuth2 provider not configured: {0}")]
    NotConfigured(String),
}
