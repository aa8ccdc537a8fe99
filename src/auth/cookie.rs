//! Cookie parsing and rendering for the session tokens.

use axum::http::header;

/// Cookie name for the access token (short-lived, 1 hour).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token (long-lived, 7 days).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Path both session cookies are scoped to.
pub const COOKIE_PATH: &str = "/api";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Render a `Set-Cookie` value for a session token.
///
/// Session cookies are always HTTP-only, secure and cross-site.
pub fn session_cookie(name: &str, value: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; HttpOnly; Path={}; Max-Age={}; SameSite=None; Secure",
        name, value, COOKIE_PATH, max_age_secs
    )
}

/// Render a `Set-Cookie` value that removes a session cookie.
pub fn cleared_cookie(name: &str) -> String {
    session_cookie(name, "", 0)
}
