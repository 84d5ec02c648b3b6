//! The `session_id` cookie contract.
//!
//! Set on login and renewal, overwritten with a short poison value on logout
//! and on every 401. The `Secure` attribute is decided once at startup from
//! the public base URL.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use std::sync::OnceLock;

pub const SESSION_COOKIE_NAME: &str = "session_id";

static COOKIE_SECURE: OnceLock<bool> = OnceLock::new();

/// Record whether cookies must carry `Secure`. First caller wins; later
/// calls (e.g. from tests) are ignored.
pub fn install_secure(secure: bool) {
    let _ = COOKIE_SECURE.set(secure);
}

fn secure() -> bool {
    COOKIE_SECURE.get().copied().unwrap_or(false)
}

/// `Set-Cookie` value carrying the session token. Tokens are hex, so the
/// error branch is unreachable in practice; callers map it to a 500.
pub fn session_cookie(token: &str, max_age_seconds: i64) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&session_cookie_value(token, max_age_seconds, secure()))
}

/// `Set-Cookie` value that clears the session on the client.
#[must_use]
pub fn clear_session_cookie() -> HeaderValue {
    if secure() {
        HeaderValue::from_static("session_id=invalid; Path=/; Max-Age=-1; HttpOnly; Secure")
    } else {
        HeaderValue::from_static("session_id=invalid; Path=/; Max-Age=-1; HttpOnly")
    }
}

/// The session token from the request's `Cookie` header, if any.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

fn session_cookie_value(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={token}; Path=/; Max-Age={max_age_seconds}; HttpOnly");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_carries_token_and_lifetime() {
        let value = session_cookie_value("abc123", 30 * 24 * 60 * 60, false);
        assert_eq!(
            value,
            "session_id=abc123; Path=/; Max-Age=2592000; HttpOnly"
        );
    }

    #[test]
    fn secure_flag_appends_the_attribute() {
        let value = session_cookie_value("abc123", 60, true);
        assert!(value.ends_with("; Secure"));
    }

    #[test]
    fn clear_cookie_poisons_and_expires() {
        let value = clear_session_cookie();
        let value = value.to_str().expect("static cookie is ascii");
        assert!(value.starts_with("session_id=invalid"));
        assert!(value.contains("Max-Age=-1"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("HttpOnly"));
    }

    #[test]
    fn extracts_the_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; session_id=deadbeef; lang=en"),
        );
        assert_eq!(
            extract_session_token(&headers),
            Some("deadbeef".to_string())
        );
    }

    #[test]
    fn missing_or_empty_cookie_yields_none() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(extract_session_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session_id="));
        assert_eq!(extract_session_token(&headers), None);
    }
}
