//! Double-submit CSRF tokens.
//!
//! The token value is `{nonce}.{mac}` where the MAC binds the nonce to the
//! issuing session under the engine's signing secret. Nothing is stored
//! server-side: validity is the echoed value matching the cookie, plus the
//! MAC proving the token was minted for the presenting session.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::utils::{base64url_decode, base64url_encode, gen_random_string};

use super::errors::SessionError;

type HmacSha256 = Hmac<Sha256>;

fn compute_mac(secret: &[u8], session_id: &str, nonce: &str) -> Result<Vec<u8>, SessionError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| SessionError::Crypto("Invalid CSRF signing key".to_string()))?;
    mac.update(session_id.as_bytes());
    mac.update(b".");
    mac.update(nonce.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Mint a CSRF token bound to `session_id`. Issued on every successful
/// authentication and on every rotation.
pub fn issue_csrf_token(session_id: &str, secret: &[u8]) -> Result<String, SessionError> {
    let nonce = gen_random_string(16)?;
    let mac = compute_mac(secret, session_id, &nonce)?;
    Ok(format!("{nonce}.{}", base64url_encode(mac)))
}

/// Verify the double-submit pair for a state-changing request.
pub fn verify_csrf_token(
    cookie_value: &str,
    presented: &str,
    session_id: &str,
    secret: &[u8],
) -> Result<(), SessionError> {
    if !bool::from(cookie_value.as_bytes().ct_eq(presented.as_bytes())) {
        return Err(SessionError::CsrfToken("CSRF token mismatch".to_string()));
    }

    let (nonce, mac_encoded) = presented
        .split_once('.')
        .ok_or_else(|| SessionError::CsrfToken("Malformed CSRF token".to_string()))?;
    let presented_mac = base64url_decode(mac_encoded)
        .map_err(|_| SessionError::CsrfToken("Malformed CSRF token".to_string()))?;

    let expected_mac = compute_mac(secret, session_id, nonce)?;
    if !bool::from(expected_mac.as_slice().ct_eq(presented_mac.as_slice())) {
        return Err(SessionError::CsrfToken(
            "CSRF token not bound to session".to_string(),
        ));
    }

    Ok(())
}
