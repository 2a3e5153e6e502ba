//! Set-Cookie emission and request-cookie extraction over plain
//! `http::HeaderMap`, so the crate stays framework-agnostic.

use http::header::{COOKIE, HeaderMap, SET_COOKIE};

use super::errors::SessionError;

/// Append a Set-Cookie header. `max_age` is omitted for session-only
/// cookies (non-remembered logins), per the browser's session semantics.
pub fn set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    max_age: Option<i64>,
    secure: bool,
    http_only: bool,
) -> Result<(), SessionError> {
    let mut cookie = format!("{name}={value}; SameSite=Lax; Path=/");
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    if http_only {
        cookie.push_str("; HttpOnly");
    }

    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| SessionError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(())
}

/// Append a Set-Cookie header that removes the cookie on the client.
pub fn clear_cookie(
    headers: &mut HeaderMap,
    name: &str,
    secure: bool,
    http_only: bool,
) -> Result<(), SessionError> {
    set_cookie(headers, name, "", Some(0), secure, http_only)
}

/// Extract a cookie value from request headers.
pub fn get_cookie_from_headers<'a>(
    headers: &'a HeaderMap,
    name: &str,
) -> Result<Option<&'a str>, SessionError> {
    let Some(cookie_header) = headers.get(COOKIE) else {
        return Ok(None);
    };

    let cookie_str = cookie_header.to_str().map_err(|e| {
        tracing::debug!("Invalid cookie header: {}", e);
        SessionError::Cookie("Invalid cookie header".to_string())
    })?;

    let value = cookie_str.split(';').map(|s| s.trim()).find_map(|s| {
        let mut parts = s.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k == name => Some(v),
            _ => None,
        }
    });

    Ok(value)
}
