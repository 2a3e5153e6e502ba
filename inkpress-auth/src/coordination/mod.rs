//! The operations surface.
//!
//! [`AuthEngine`] wires the injected stores, the lockout tracker, the rate
//! limiter, the audit log and the mail collaborator into the procedure-style
//! operations the platform calls: login, refresh, sign-out, registration,
//! email verification, password reset, OAuth callback, account management
//! and the cleanup sweeper. One submodule per flow.

mod account;
mod cleanup;
mod errors;
mod login;
mod oauth2;
mod refresh;
mod register;
mod reset;

use std::sync::Arc;

use chrono::Utc;
use http::HeaderMap;

use crate::audit::AuditLog;
use crate::config::AuthConfig;
use crate::lockout::LockoutTracker;
use crate::mail::Mailer;
use crate::oauth2::OAuth2Client;
use crate::ratelimit::RateLimiter;
use crate::session::{
    RotationEngine, Session, SessionStore, clear_cookie, issue_csrf_token, set_cookie,
};
use crate::storage::DataStore;
use crate::tokens::TokenService;
use crate::userdb::{User, UserStore};
use crate::utils::gen_random_string;

pub use cleanup::CleanupCounts;
pub use errors::AuthError;
pub use register::Registered;

/// Successful authentication payload: the cookies to attach plus the values
/// a client needs in the response body.
#[derive(Debug)]
pub struct Authenticated {
    pub user_id: String,
    pub session_id: String,
    pub csrf_token: String,
    /// Set-Cookie headers for the session and CSRF cookies
    pub headers: HeaderMap,
}

#[derive(Clone)]
pub struct AuthEngine {
    config: AuthConfig,
    users: UserStore,
    rotation: RotationEngine,
    tokens: TokenService,
    rate_limiter: RateLimiter,
    lockout: LockoutTracker,
    audit: AuditLog,
    mailer: Arc<dyn Mailer>,
    oauth_google: Option<OAuth2Client>,
}

impl AuthEngine {
    pub fn new(store: DataStore, config: AuthConfig, mailer: Arc<dyn Mailer>) -> Self {
        let users = UserStore::new(store.clone());
        let sessions = SessionStore::new(store.clone());
        let rotation = RotationEngine::new(sessions, &config);
        let tokens = TokenService::new(store.clone());
        let rate_limiter = RateLimiter::new(store.clone(), &config);
        let lockout = LockoutTracker::new(
            users.clone(),
            config.lockout_threshold,
            config.lockout_duration,
        );
        let audit = AuditLog::new(store);
        let oauth_google = config
            .oauth2_google
            .clone()
            .map(|p| OAuth2Client::new(p, config.upstream_timeout, config.upstream_retries));

        Self {
            config,
            users,
            rotation,
            tokens,
            rate_limiter,
            lockout,
            audit,
            mailer,
            oauth_google,
        }
    }

    /// Connect to `url`, build the engine and create its tables.
    pub async fn connect(
        url: &str,
        config: AuthConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        let store = DataStore::connect(url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect data store");
            AuthError::Internal
        })?;
        let engine = Self::new(store, config, mailer);
        engine.init().await?;
        Ok(engine)
    }

    /// Create every table this engine owns. Idempotent.
    pub async fn init(&self) -> Result<(), AuthError> {
        self.users.init().await?;
        self.rotation.store().init().await?;
        self.tokens.init().await?;
        self.rate_limiter.init().await?;
        self.audit.init().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize audit store");
            AuthError::Internal
        })?;
        Ok(())
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Read access to the audit trail (admin tooling, tests).
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Read access to the session store (admin tooling, tests).
    pub fn sessions(&self) -> &SessionStore {
        self.rotation.store()
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// Bundle a fresh session into cookies plus a bound CSRF token.
    pub(crate) fn issue_session_response(
        &self,
        session: &Session,
    ) -> Result<Authenticated, AuthError> {
        let csrf_token = issue_csrf_token(&session.id, &self.config.signing_secret)?;

        // Remembered sessions carry Max-Age; others are session-only cookies.
        let max_age = session
            .remembered
            .then(|| (session.expires_at - Utc::now()).num_seconds());

        let mut headers = HeaderMap::new();
        set_cookie(
            &mut headers,
            &self.config.session_cookie_name,
            &session.id,
            max_age,
            self.config.cookie_secure,
            true,
        )?;
        // The CSRF cookie is readable by the client so the double-submit
        // echo is possible.
        set_cookie(
            &mut headers,
            &self.config.csrf_cookie_name,
            &csrf_token,
            max_age,
            self.config.cookie_secure,
            false,
        )?;

        Ok(Authenticated {
            user_id: session.user_id.clone(),
            session_id: session.id.clone(),
            csrf_token,
            headers,
        })
    }

    /// Set-Cookie headers that remove both auth cookies.
    pub(crate) fn cleared_cookies(&self) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();
        clear_cookie(
            &mut headers,
            &self.config.session_cookie_name,
            self.config.cookie_secure,
            true,
        )?;
        clear_cookie(
            &mut headers,
            &self.config.csrf_cookie_name,
            self.config.cookie_secure,
            false,
        )?;
        Ok(headers)
    }

    /// Resolve a presented session id to its live owner. Used by operations
    /// that act on "the signed-in user" without rotating.
    pub(crate) async fn require_session_user(&self, session_id: &str) -> Result<User, AuthError> {
        let session = self
            .rotation
            .store()
            .get_session(session_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if !session.is_active() || session.is_expired(Utc::now()) {
            return Err(AuthError::SessionInvalid.log());
        }

        let user = self
            .users
            .get_user(&session.user_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if user.is_deleted() {
            return Err(AuthError::SessionInvalid.log());
        }

        Ok(user)
    }

    /// Generate a unique user ID, with built-in collision detection.
    pub(crate) async fn gen_new_user_id(&self) -> Result<String, AuthError> {
        // Try up to 3 times to generate a unique ID
        for _ in 0..3 {
            let id = gen_random_string(32)?;

            match self.users.get_user(&id).await {
                Ok(None) => return Ok(id),
                Ok(Some(_)) => {
                    tracing::warn!("Generated user ID collided; retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::error!("Failed to generate a unique user ID after 3 attempts");
        Err(AuthError::Internal)
    }

    /// Whether `email` matches the configured admin marker.
    pub(crate) fn is_admin_email(&self, email: &str) -> bool {
        self.config
            .admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email))
    }
}
