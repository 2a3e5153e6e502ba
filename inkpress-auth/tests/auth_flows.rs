//! End-to-end flows against an in-memory store: login, lockout, rotation
//! and breach detection, rate limits, password reset, email verification,
//! account lifecycle and the cleanup sweeper.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use inkpress_auth::{
    AuthConfig, AuthEngine, AuthError, ClientInfo, MailError, Mailer, RateLimitPolicy,
};

#[derive(Debug, Clone)]
struct SentMail {
    to: String,
    subject: String,
    html: String,
}

/// Captures outbound mail so tests can pull tokens out of it.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The `<code>…</code>` payload of the most recent message.
    fn last_code(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let html = &sent.last()?.html;
        Some(html.split("<code>").nth(1)?.split("</code>").next()?.to_string())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

fn client() -> ClientInfo {
    ClientInfo::new("203.0.113.7", "integration-test-agent")
}

fn test_config() -> AuthConfig {
    AuthConfig {
        cookie_secure: false,
        lockout_threshold: 5,
        lockout_duration: Duration::minutes(15),
        rate_limit_login: RateLimitPolicy::new(20, Duration::minutes(10)),
        rate_limit_register: RateLimitPolicy::new(5, Duration::hours(1)),
        ..AuthConfig::default()
    }
}

async fn engine_with(config: AuthConfig) -> (AuthEngine, Arc<RecordingMailer>) {
    // RUST_LOG=debug makes a failing flow readable; idempotent across tests
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let mailer = Arc::new(RecordingMailer::default());
    let engine = AuthEngine::connect("sqlite::memory:", config, mailer.clone())
        .await
        .expect("engine should connect");
    (engine, mailer)
}

async fn engine() -> (AuthEngine, Arc<RecordingMailer>) {
    engine_with(test_config()).await
}

async fn register_user(engine: &AuthEngine, email: &str, password: &str) -> String {
    engine
        .register(email, password, password, &client())
        .await
        .expect("registration should succeed")
        .user_id
}

#[tokio::test]
async fn login_and_refresh_produce_cookie_bundles() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let authed = engine
        .login("author@example.com", "Sturdy pass 1A", true, &client())
        .await
        .expect("login");

    let cookies: Vec<_> = authed
        .headers
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.contains(&authed.session_id)));
    assert!(cookies.iter().any(|c| c.contains(&authed.csrf_token)));
    // Remembered login: both cookies carry Max-Age
    assert!(cookies.iter().all(|c| c.contains("Max-Age=")));

    let rotated = engine
        .refresh(&authed.session_id, &client())
        .await
        .expect("refresh");
    assert_eq!(rotated.user_id, authed.user_id);
    assert_ne!(rotated.session_id, authed.session_id);
    assert_ne!(rotated.csrf_token, authed.csrf_token);
}

#[tokio::test]
async fn session_only_login_omits_max_age() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let authed = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");

    for value in authed.headers.get_all(http::header::SET_COOKIE) {
        assert!(!value.to_str().unwrap().contains("Max-Age="));
    }
}

#[tokio::test]
async fn unknown_email_and_wrong_password_are_indistinguishable() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let unknown = engine
        .login("nobody@example.com", "whatever1A", false, &client())
        .await;
    let wrong = engine
        .login("author@example.com", "wrong password 1A", false, &client())
        .await;

    assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn successful_login_resets_failure_count() {
    let (engine, _) = engine().await;
    let user_id = register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    for _ in 0..3 {
        let _ = engine
            .login("author@example.com", "wrong password 1A", false, &client())
            .await;
    }

    engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login succeeds below the threshold");

    let user = engine
        .users()
        .get_user(&user_id)
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(user.failed_attempts, 0);
    assert!(user.locked_until.is_none());
}

// Scenario A: five wrong attempts, then the correct password still answers
// AccountLocked with a positive remaining duration.
#[tokio::test]
async fn lockout_rejects_correct_password_while_locked() {
    let (engine, _) = engine().await;
    register_user(&engine, "user@example.com", "Sturdy pass 1A").await;

    for _ in 0..5 {
        let result = engine
            .login("user@example.com", "wrong password 1A", false, &client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    match engine
        .login("user@example.com", "Sturdy pass 1A", false, &client())
        .await
    {
        Err(AuthError::AccountLocked { remaining }) => {
            assert!(remaining > Duration::zero());
            assert!(remaining <= Duration::minutes(15));
        }
        other => panic!("expected AccountLocked, got {other:?}"),
    }
}

// Scenario B: replaying a rotated credential revokes the whole family,
// including the still-fresh child.
#[tokio::test]
async fn replayed_refresh_credential_revokes_family() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let s0 = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");
    let s1 = engine
        .refresh(&s0.session_id, &client())
        .await
        .expect("first refresh");

    let replay = engine.refresh(&s0.session_id, &client()).await;
    assert!(matches!(replay, Err(AuthError::SessionInvalid)));

    let collateral = engine.refresh(&s1.session_id, &client()).await;
    assert!(matches!(collateral, Err(AuthError::SessionInvalid)));

    // The breach is recorded distinctly even though the caller only saw
    // SessionInvalid.
    let events = engine.audit().recent(20).await.expect("audit read");
    assert!(events.iter().any(|e| e.kind == "session_reuse_detected"));
}

#[tokio::test]
async fn refresh_chain_increments_rotation_within_family() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let s0 = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");
    let s1 = engine.refresh(&s0.session_id, &client()).await.expect("r1");
    let s2 = engine.refresh(&s1.session_id, &client()).await.expect("r2");

    let row0 = engine
        .sessions()
        .get_session(&s0.session_id)
        .await
        .expect("get")
        .expect("present");
    let row2 = engine
        .sessions()
        .get_session(&s2.session_id)
        .await
        .expect("get")
        .expect("present");

    assert_eq!(row0.family_id, row2.family_id);
    assert_eq!(row2.rotation_count, 2);
    assert!(row0.rotated);
    assert!(row2.is_active());
}

#[tokio::test]
async fn sign_out_terminates_every_session_in_the_family() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let s0 = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");
    let s1 = engine.refresh(&s0.session_id, &client()).await.expect("r1");

    let headers = engine
        .sign_out(&s1.session_id, &client())
        .await
        .expect("sign out");
    assert_eq!(headers.get_all(http::header::SET_COOKIE).iter().count(), 2);

    let result = engine.refresh(&s1.session_id, &client()).await;
    assert!(matches!(result, Err(AuthError::SessionInvalid)));

    // Idempotent, including for ids that never existed
    engine
        .sign_out(&s1.session_id, &client())
        .await
        .expect("sign out again");
    engine
        .sign_out("never-existed", &client())
        .await
        .expect("unknown id");
}

#[tokio::test]
async fn sign_out_does_not_touch_other_families() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let phone = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("phone login");
    let laptop = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("laptop login");

    engine
        .sign_out(&phone.session_id, &client())
        .await
        .expect("sign out phone");

    engine
        .refresh(&laptop.session_id, &client())
        .await
        .expect("laptop session survives");
}

// Scenario C: a reset token works exactly once.
#[tokio::test]
async fn password_reset_token_is_single_use() {
    let (engine, mailer) = engine().await;
    register_user(&engine, "a@b.com", "Original pass 1A").await;

    engine
        .request_password_reset("a@b.com", &client())
        .await
        .expect("request reset");
    let token = mailer.last_code().expect("reset mail contains the token");

    engine
        .reset_password(&token, "NewPass1!", "NewPass1!", &client())
        .await
        .expect("first reset succeeds");

    let second = engine
        .reset_password(&token, "OtherPass2!", "OtherPass2!", &client())
        .await;
    assert!(matches!(second, Err(AuthError::TokenExpiredOrUsed)));

    // Old password is dead, new one works
    let old = engine
        .login("a@b.com", "Original pass 1A", false, &client())
        .await;
    assert!(matches!(old, Err(AuthError::InvalidCredentials)));
    engine
        .login("a@b.com", "NewPass1!", false, &client())
        .await
        .expect("new password works");
}

#[tokio::test]
async fn password_reset_revokes_outstanding_sessions() {
    let (engine, mailer) = engine().await;
    register_user(&engine, "a@b.com", "Original pass 1A").await;

    let session = engine
        .login("a@b.com", "Original pass 1A", true, &client())
        .await
        .expect("login");

    engine
        .request_password_reset("a@b.com", &client())
        .await
        .expect("request reset");
    let token = mailer.last_code().expect("token");
    engine
        .reset_password(&token, "NewPass1!", "NewPass1!", &client())
        .await
        .expect("reset");

    let result = engine.refresh(&session.session_id, &client()).await;
    assert!(matches!(result, Err(AuthError::SessionInvalid)));
}

#[tokio::test]
async fn password_reset_clears_lockout() {
    let (engine, mailer) = engine().await;
    register_user(&engine, "a@b.com", "Original pass 1A").await;

    for _ in 0..5 {
        let _ = engine
            .login("a@b.com", "wrong password 1A", false, &client())
            .await;
    }

    engine
        .request_password_reset("a@b.com", &client())
        .await
        .expect("request reset");
    let token = mailer.last_code().expect("token");
    engine
        .reset_password(&token, "NewPass1!", "NewPass1!", &client())
        .await
        .expect("reset");

    engine
        .login("a@b.com", "NewPass1!", false, &client())
        .await
        .expect("lock cleared by reset");
}

#[tokio::test]
async fn reset_request_for_unknown_email_reveals_nothing() {
    let (engine, mailer) = engine().await;

    engine
        .request_password_reset("ghost@example.com", &client())
        .await
        .expect("request succeeds");
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn mismatched_confirmation_does_not_burn_the_token() {
    let (engine, mailer) = engine().await;
    register_user(&engine, "a@b.com", "Original pass 1A").await;

    engine
        .request_password_reset("a@b.com", &client())
        .await
        .expect("request reset");
    let token = mailer.last_code().expect("token");

    let mismatch = engine
        .reset_password(&token, "NewPass1!", "Different2!", &client())
        .await;
    assert!(matches!(mismatch, Err(AuthError::Validation(_))));

    // The token survived the failed attempt
    engine
        .reset_password(&token, "NewPass1!", "NewPass1!", &client())
        .await
        .expect("token still valid");
}

// Scenario D: with a registration ceiling of 5 per address, attempts 6-10
// from one address are rejected with a retry-after within the window.
#[tokio::test]
async fn registration_is_throttled_per_address() {
    let (engine, _) = engine().await;

    for i in 0..5 {
        engine
            .register(
                &format!("writer{i}@example.com"),
                "Sturdy pass 1A",
                "Sturdy pass 1A",
                &client(),
            )
            .await
            .expect("within ceiling");
    }

    for i in 5..10 {
        match engine
            .register(
                &format!("writer{i}@example.com"),
                "Sturdy pass 1A",
                "Sturdy pass 1A",
                &client(),
            )
            .await
        {
            Err(AuthError::RateLimited { retry_after }) => {
                assert!(retry_after > Duration::zero());
                assert!(retry_after <= Duration::hours(1));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let result = engine
        .register(
            "Author@Example.com",
            "Another pass 1A",
            "Another pass 1A",
            &client(),
        )
        .await;
    assert!(matches!(result, Err(AuthError::Conflict(_))));
}

#[tokio::test]
async fn registration_enforces_password_policy() {
    let (engine, _) = engine().await;

    let weak = engine
        .register("weak@example.com", "short1A", "short1A", &client())
        .await;
    assert!(matches!(weak, Err(AuthError::Validation(_))));

    let mismatch = engine
        .register(
            "weak@example.com",
            "Sturdy pass 1A",
            "Sturdy pass 1B",
            &client(),
        )
        .await;
    assert!(matches!(mismatch, Err(AuthError::Validation(_))));
}

#[tokio::test]
async fn email_verification_flow() {
    let (engine, mailer) = engine().await;
    let user_id = register_user(&engine, "new@example.com", "Sturdy pass 1A").await;

    let mails = mailer.sent();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0].to, "new@example.com");

    let token = mailer.last_code().expect("verification token");
    engine
        .verify_email(&token, &client())
        .await
        .expect("verify");

    let user = engine
        .users()
        .get_user(&user_id)
        .await
        .expect("lookup")
        .expect("present");
    assert!(user.email_verified);

    // The token is single-use like every other capability token
    let replay = engine.verify_email(&token, &client()).await;
    assert!(matches!(replay, Err(AuthError::TokenExpiredOrUsed)));
}

#[tokio::test]
async fn verification_resend_is_silent_for_unknown_or_verified() {
    let (engine, mailer) = engine().await;
    register_user(&engine, "new@example.com", "Sturdy pass 1A").await;
    let baseline = mailer.sent().len();

    engine
        .resend_email_verification("ghost@example.com", &client())
        .await
        .expect("unknown email is fine");
    assert_eq!(mailer.sent().len(), baseline);

    engine
        .resend_email_verification("new@example.com", &client())
        .await
        .expect("resend");
    assert_eq!(mailer.sent().len(), baseline + 1);
}

#[tokio::test]
async fn profile_update_requires_live_session() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let authed = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");

    let updated = engine
        .update_profile(
            &authed.session_id,
            Some("Pen Name".to_string()),
            Some("https://cdn.example/avatar.png".to_string()),
        )
        .await
        .expect("update");
    assert_eq!(updated.label, "Pen Name");

    let stale = engine
        .update_profile("not-a-session", Some("x".to_string()), None)
        .await;
    assert!(matches!(stale, Err(AuthError::SessionInvalid)));
}

#[tokio::test]
async fn deleted_account_becomes_tombstone_and_cannot_login() {
    let (engine, _) = engine().await;
    let user_id = register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let authed = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");

    engine
        .delete_account(&authed.session_id, &client())
        .await
        .expect("delete");

    let tombstone = engine
        .users()
        .get_user(&user_id)
        .await
        .expect("lookup")
        .expect("row is kept");
    assert!(tombstone.is_deleted());

    let login = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await;
    assert!(matches!(login, Err(AuthError::InvalidCredentials)));

    let refresh = engine.refresh(&authed.session_id, &client()).await;
    assert!(matches!(refresh, Err(AuthError::SessionInvalid)));
}

#[tokio::test]
async fn csrf_tokens_verify_against_their_session_only() {
    let (engine, _) = engine().await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let authed = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");

    let secret = &engine.config().signing_secret;
    inkpress_auth::verify_csrf_token(
        &authed.csrf_token,
        &authed.csrf_token,
        &authed.session_id,
        secret,
    )
    .expect("bound to issuing session");

    let err = inkpress_auth::verify_csrf_token(
        &authed.csrf_token,
        &authed.csrf_token,
        "some-other-session",
        secret,
    );
    assert!(err.is_err());
}

#[tokio::test]
async fn sweeper_collects_expired_state() {
    let (engine, _) = engine_with(AuthConfig {
        cookie_secure: false,
        // Sessions are born expired and immediately past the grace window
        session_ttl: Duration::days(-2),
        session_cleanup_grace: Duration::days(1),
        reset_token_ttl: Duration::seconds(-1),
        ..test_config()
    })
    .await;
    register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");
    engine
        .request_password_reset("author@example.com", &client())
        .await
        .expect("reset request");

    let counts = engine.cleanup_expired().await.expect("sweep");
    assert_eq!(counts.expired_sessions, 1);
    assert_eq!(counts.expired_tokens, 1);

    // Concurrent-safe and skippable: a second sweep finds nothing
    let again = engine.cleanup_expired().await.expect("sweep again");
    assert_eq!(again.expired_sessions, 0);
}

#[tokio::test]
async fn audit_trail_records_the_whole_story() {
    let (engine, mailer) = engine().await;
    let user_id = register_user(&engine, "author@example.com", "Sturdy pass 1A").await;

    let _ = engine
        .login("author@example.com", "wrong password 1A", false, &client())
        .await;
    let authed = engine
        .login("author@example.com", "Sturdy pass 1A", false, &client())
        .await
        .expect("login");
    let rotated = engine
        .refresh(&authed.session_id, &client())
        .await
        .expect("refresh");
    engine
        .sign_out(&rotated.session_id, &client())
        .await
        .expect("sign out");
    engine
        .request_password_reset("author@example.com", &client())
        .await
        .expect("reset request");
    let token = mailer.last_code().expect("token");
    engine
        .reset_password(&token, "NewPass1!", "NewPass1!", &client())
        .await
        .expect("reset");

    let events = engine
        .audit()
        .events_for_user(&user_id, 50)
        .await
        .expect("audit read");
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();

    for expected in [
        "registered",
        "email_verification_requested",
        "login_failed",
        "login_succeeded",
        "session_rotated",
        "signed_out",
        "password_reset_requested",
        "password_reset_completed",
    ] {
        assert!(kinds.contains(&expected), "missing audit event {expected}");
    }
}
