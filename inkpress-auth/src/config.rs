//! Engine configuration.
//!
//! Everything tunable about the engine lives here: the signing secret, the
//! admin marker, session lifetimes, lockout and rate-limit policy, token
//! lifetimes, cookie attributes and the OAuth2 provider endpoints. Values are
//! read from the environment via [`AuthConfig::from_env`]; tests construct
//! configs directly or start from [`Default`].

use std::env;

use chrono::Duration;

/// Ceiling and window for one rate-limited action.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Attempts allowed per window
    pub max_attempts: u32,
    /// Window length
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
        }
    }
}

/// OAuth2 provider endpoints and credentials.
#[derive(Debug, Clone)]
pub struct OAuth2ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_url: String,
    pub userinfo_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for CSRF token binding
    pub signing_secret: Vec<u8>,
    /// A user registering or OAuth-signing-in with this email becomes admin
    pub admin_email: Option<String>,

    /// Lifetime of a non-remembered session
    pub session_ttl: Duration,
    /// Lifetime of a remembered session
    pub session_ttl_remembered: Duration,
    /// Hard ceiling on rotations within one token family
    pub session_max_rotations: u32,
    /// Grace period past expiry before the sweeper deletes a session
    pub session_cleanup_grace: Duration,
    /// How long revoked sessions are retained before deletion
    pub revoked_session_retention: Duration,

    pub session_cookie_name: String,
    pub csrf_cookie_name: String,
    /// Set the `Secure` cookie attribute (disable only in local development)
    pub cookie_secure: bool,

    /// Consecutive failures before an account locks
    pub lockout_threshold: u32,
    /// How long a tripped lock lasts
    pub lockout_duration: Duration,

    pub rate_limit_login: RateLimitPolicy,
    pub rate_limit_register: RateLimitPolicy,
    pub rate_limit_password_reset: RateLimitPolicy,
    pub rate_limit_resend_verification: RateLimitPolicy,

    pub reset_token_ttl: Duration,
    pub verification_token_ttl: Duration,

    pub oauth2_google: Option<OAuth2ProviderConfig>,
    /// Per-call timeout for identity-provider exchanges
    pub upstream_timeout: std::time::Duration,
    /// Bounded retries on transient upstream network failures
    pub upstream_retries: u32,

    /// Per-call timeout for outbound mail sends
    pub mail_timeout: std::time::Duration,
    /// Bounded retries on retryable mail failures
    pub mail_retries: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_secret: b"default_secret_key_change_in_production".to_vec(),
            admin_email: None,
            session_ttl: Duration::days(1),
            session_ttl_remembered: Duration::days(30),
            session_max_rotations: 500,
            session_cleanup_grace: Duration::days(1),
            revoked_session_retention: Duration::days(7),
            session_cookie_name: "__Host-SessionId".to_string(),
            csrf_cookie_name: "__Host-CsrfToken".to_string(),
            cookie_secure: true,
            lockout_threshold: 5,
            lockout_duration: Duration::minutes(15),
            rate_limit_login: RateLimitPolicy::new(10, Duration::minutes(15)),
            rate_limit_register: RateLimitPolicy::new(5, Duration::hours(1)),
            rate_limit_password_reset: RateLimitPolicy::new(3, Duration::hours(1)),
            rate_limit_resend_verification: RateLimitPolicy::new(3, Duration::hours(1)),
            reset_token_ttl: Duration::hours(1),
            verification_token_ttl: Duration::days(1),
            oauth2_google: None,
            upstream_timeout: std::time::Duration::from_secs(15),
            upstream_retries: 2,
            mail_timeout: std::time::Duration::from_secs(10),
            mail_retries: 2,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_seconds(key: &str, default: i64) -> Duration {
    Duration::seconds(
        env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

impl AuthConfig {
    /// Build a config from environment variables (loading `.env` if
    /// present), falling back to the defaults above for anything unset or
    /// unparseable.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let signing_secret = match env::var("AUTH_SIGNING_SECRET") {
            Ok(secret) => secret.into_bytes(),
            Err(_) => defaults.signing_secret.clone(),
        };

        let oauth2_google = match (
            env::var("OAUTH2_GOOGLE_CLIENT_ID"),
            env::var("OAUTH2_GOOGLE_CLIENT_SECRET"),
            env::var("OAUTH2_REDIRECT_URI"),
        ) {
            (Ok(client_id), Ok(client_secret), Ok(redirect_uri)) => {
                if url::Url::parse(&redirect_uri).is_err() {
                    tracing::warn!(
                        redirect_uri = %redirect_uri,
                        "OAUTH2_REDIRECT_URI is not a valid URL; OAuth2 disabled"
                    );
                    None
                } else {
                    Some(OAuth2ProviderConfig {
                        client_id,
                        client_secret,
                        redirect_uri,
                        token_url: env::var("OAUTH2_TOKEN_URL")
                            .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
                        userinfo_url: env::var("OAUTH2_USERINFO_URL").unwrap_or_else(|_| {
                            "https://www.googleapis.com/oauth2/v2/userinfo".to_string()
                        }),
                    })
                }
            }
            _ => None,
        };

        Self {
            signing_secret,
            admin_email: env::var("ADMIN_EMAIL").ok(),
            session_ttl: env_seconds("SESSION_TTL", 86_400),
            session_ttl_remembered: env_seconds("SESSION_TTL_REMEMBERED", 2_592_000),
            session_max_rotations: env_u32("SESSION_MAX_ROTATIONS", 500),
            session_cleanup_grace: env_seconds("SESSION_CLEANUP_GRACE", 86_400),
            revoked_session_retention: env_seconds("REVOKED_SESSION_RETENTION", 604_800),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or(defaults.session_cookie_name),
            csrf_cookie_name: env::var("CSRF_COOKIE_NAME").unwrap_or(defaults.csrf_cookie_name),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v != "false")
                .unwrap_or(true),
            lockout_threshold: env_u32("LOCKOUT_THRESHOLD", 5),
            lockout_duration: env_seconds("LOCKOUT_DURATION", 900),
            rate_limit_login: RateLimitPolicy::new(
                env_u32("RATE_LIMIT_LOGIN_MAX", 10),
                env_seconds("RATE_LIMIT_LOGIN_WINDOW", 900),
            ),
            rate_limit_register: RateLimitPolicy::new(
                env_u32("RATE_LIMIT_REGISTER_MAX", 5),
                env_seconds("RATE_LIMIT_REGISTER_WINDOW", 3_600),
            ),
            rate_limit_password_reset: RateLimitPolicy::new(
                env_u32("RATE_LIMIT_RESET_MAX", 3),
                env_seconds("RATE_LIMIT_RESET_WINDOW", 3_600),
            ),
            rate_limit_resend_verification: RateLimitPolicy::new(
                env_u32("RATE_LIMIT_RESEND_MAX", 3),
                env_seconds("RATE_LIMIT_RESEND_WINDOW", 3_600),
            ),
            reset_token_ttl: env_seconds("RESET_TOKEN_TTL", 3_600),
            verification_token_ttl: env_seconds("VERIFICATION_TOKEN_TTL", 86_400),
            oauth2_google,
            upstream_timeout: std::time::Duration::from_secs(env_u64("UPSTREAM_TIMEOUT", 15)),
            upstream_retries: env_u32("UPSTREAM_RETRIES", 2),
            mail_timeout: std::time::Duration::from_secs(env_u64("MAIL_TIMEOUT", 10)),
            mail_retries: env_u32("MAIL_RETRIES", 2),
        }
    }

    /// Session lifetime for the given remember-me choice.
    pub fn session_ttl_for(&self, remembered: bool) -> Duration {
        if remembered {
            self.session_ttl_remembered
        } else {
            self.session_ttl
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to set an environment variable for the duration of a test and
    /// restore the original value afterward.
    fn with_env_var<F, R>(key: &str, value: Option<&str>, test: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();

        match value {
            Some(val) => unsafe { env::set_var(key, val) },
            None => unsafe { env::remove_var(key) },
        }

        let result = test();

        match original {
            Some(val) => unsafe { env::set_var(key, val) },
            None => unsafe { env::remove_var(key) },
        }

        result
    }

    #[test]
    fn test_default_lockout_policy() {
        let config = AuthConfig::default();
        assert_eq!(config.lockout_threshold, 5);
        assert_eq!(config.lockout_duration, Duration::minutes(15));
    }

    #[test]
    fn test_session_ttl_for_remembered() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl_for(false), config.session_ttl);
        assert_eq!(config.session_ttl_for(true), config.session_ttl_remembered);
    }

    #[test]
    fn test_from_env_parses_lockout_threshold() {
        with_env_var("LOCKOUT_THRESHOLD", Some("3"), || {
            let config = AuthConfig::from_env();
            assert_eq!(config.lockout_threshold, 3);
        });
    }

    #[test]
    fn test_from_env_falls_back_on_invalid_value() {
        with_env_var("SESSION_TTL", Some("not-a-number"), || {
            let config = AuthConfig::from_env();
            assert_eq!(config.session_ttl, Duration::seconds(86_400));
        });
    }

    #[test]
    fn test_from_env_cookie_secure_opt_out() {
        with_env_var("COOKIE_SECURE", Some("false"), || {
            let config = AuthConfig::from_env();
            assert!(!config.cookie_secure);
        });
    }
}
