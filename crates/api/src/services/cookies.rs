//! Cookie helpers for the session and CSRF cookies.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::config::SecurityConfig;

/// Name of the cookie carrying the raw session token.
pub const SESSION_COOKIE: &str = "coconut_session";

/// Name of the cookie carrying the CSRF nonce.
pub const CSRF_COOKIE: &str = "coconut_csrf";

/// Builds and reads the application's cookies.
#[derive(Debug, Clone)]
pub struct CookieHelper {
    secure: bool,
    session_max_age_secs: i64,
}

impl CookieHelper {
    pub fn new(secure: bool, session_max_age_secs: i64) -> Self {
        Self {
            secure,
            session_max_age_secs,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.session_cookie_secure, config.session_ttl_secs)
    }

    /// Set-Cookie value for a freshly issued session token.
    pub fn build_session_cookie(&self, token: &str) -> String {
        self.build_cookie(SESSION_COOKIE, token, Some(self.session_max_age_secs))
    }

    /// Set-Cookie value that removes the session cookie.
    pub fn build_clear_session_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly",
            SESSION_COOKIE
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=Lax");
        cookie
    }

    /// Set-Cookie value for the CSRF nonce; lives as long as the browser session.
    pub fn build_csrf_cookie(&self, nonce: &str) -> String {
        self.build_cookie(CSRF_COOKIE, nonce, None)
    }

    pub fn append(headers: &mut HeaderMap, cookie: &str) {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.append(SET_COOKIE, value);
        }
    }

    fn build_cookie(&self, name: &str, value: &str, max_age: Option<i64>) -> String {
        let mut cookie = format!("{}={}; Path=/", name, value);

        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }

        cookie.push_str("; HttpOnly");

        if self.secure {
            cookie.push_str("; Secure");
        }

        cookie.push_str("; SameSite=Lax");
        cookie
    }
}

/// Extract a cookie value from request headers by name.
pub fn extract_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .map(str::trim)
        .find_map(|cookie| {
            let (cookie_name, cookie_value) = cookie.split_once('=')?;
            (cookie_name == name && !cookie_value.is_empty()).then_some(cookie_value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_session_cookie() {
        let helper = CookieHelper::new(true, 43200);
        let cookie = helper.build_session_cookie("tok");

        assert!(cookie.starts_with("coconut_session=tok; Path=/"));
        assert!(cookie.contains("Max-Age=43200"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_cookie_without_secure() {
        let helper = CookieHelper::new(false, 60);
        assert!(!helper.build_session_cookie("tok").contains("Secure"));
        assert!(!helper.build_clear_session_cookie().contains("Secure"));
    }

    #[test]
    fn test_build_clear_cookie() {
        let helper = CookieHelper::new(false, 60);
        let cookie = helper.build_clear_session_cookie();

        assert!(cookie.starts_with("coconut_session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[test]
    fn test_csrf_cookie_has_no_max_age() {
        let helper = CookieHelper::new(false, 60);
        let cookie = helper.build_csrf_cookie("nonce");
        assert!(cookie.starts_with("coconut_csrf=nonce"));
        assert!(!cookie.contains("Max-Age"));
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("coconut_csrf=n1; other=value; coconut_session=abc123"),
        );

        assert_eq!(extract_cookie(&headers, SESSION_COOKIE), Some("abc123"));
        assert_eq!(extract_cookie(&headers, CSRF_COOKIE), Some("n1"));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_extract_cookie_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("coconut_session="),
        );
        assert_eq!(extract_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn test_append_adds_set_cookie() {
        let mut headers = HeaderMap::new();
        CookieHelper::append(&mut headers, "a=b");
        CookieHelper::append(&mut headers, "c=d");
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 2);
    }
}
