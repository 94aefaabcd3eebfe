//! Session cookie transport.
//!
//! The signed token travels in an HttpOnly cookie named `token`. A bearer
//! `Authorization` header is accepted as a fallback for non-browser clients.
//! The short-lived `oauth_state` cookie carries the CSRF state through the
//! Google redirect.

use std::time::Duration;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE, InvalidHeaderValue},
};
use cookie::{Cookie, SameSite};

use crate::config::{CookieConfig, CookieMode};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "token";

/// OAuth state cookie name.
pub const OAUTH_STATE_COOKIE_NAME: &str = "oauth_state";

/// OAuth state lifetime in seconds (10 minutes).
const OAUTH_STATE_SECONDS: i64 = 10 * 60;

/// Builds and reads session cookies according to the configured hardening.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    mode: CookieMode,
    domain: Option<String>,
    max_age: i64,
}

impl SessionCookies {
    /// Cookie settings with a `Max-Age` equal to the token lifetime.
    #[must_use]
    pub fn new(config: &CookieConfig, ttl: Duration) -> Self {
        Self {
            mode: config.mode,
            domain: config.domain.clone(),
            max_age: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    const fn secure(&self) -> bool {
        matches!(self.mode, CookieMode::Hardened)
    }

    const fn same_site(&self) -> SameSite {
        match self.mode {
            CookieMode::Hardened => SameSite::None,
            CookieMode::Relaxed => SameSite::Lax,
        }
    }

    fn session_cookie(&self, value: String) -> cookie::CookieBuilder<'static> {
        let builder = Cookie::build((SESSION_COOKIE_NAME, value))
            .http_only(true)
            .secure(self.secure())
            .same_site(self.same_site())
            .path("/");
        match &self.domain {
            Some(domain) => builder.domain(domain.clone()),
            None => builder,
        }
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token contains bytes not allowed in a header.
    pub fn issue(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let cookie = self
            .session_cookie(token.to_owned())
            .max_age(cookie::time::Duration::seconds(self.max_age))
            .build();
        HeaderValue::from_str(&cookie.to_string())
    }

    /// `Set-Cookie` values that remove the session cookie.
    ///
    /// The first uses the same attributes as [`Self::issue`] with an empty
    /// value and `Max-Age=0`. The second is a past-dated replacement for
    /// clients that ignore `Max-Age`. Send both.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured domain is not a valid header value.
    pub fn clear(&self) -> Result<[HeaderValue; 2], InvalidHeaderValue> {
        let expired = self
            .session_cookie(String::new())
            .max_age(cookie::time::Duration::ZERO)
            .build();
        let past_dated = self
            .session_cookie(String::new())
            .expires(cookie::time::OffsetDateTime::UNIX_EPOCH)
            .build();
        Ok([
            HeaderValue::from_str(&expired.to_string())?,
            HeaderValue::from_str(&past_dated.to_string())?,
        ])
    }

    /// `Set-Cookie` value carrying the OAuth `state`.
    ///
    /// Always `SameSite=Lax`; the provider redirect back is a top-level
    /// cross-site navigation.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is not a valid header value.
    pub fn oauth_state(&self, state: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let cookie = Cookie::build((OAUTH_STATE_COOKIE_NAME, state.to_owned()))
            .http_only(true)
            .secure(self.secure())
            .same_site(SameSite::Lax)
            .path("/auth/google")
            .max_age(cookie::time::Duration::seconds(OAUTH_STATE_SECONDS))
            .build();
        HeaderValue::from_str(&cookie.to_string())
    }

    /// `Set-Cookie` value that removes the OAuth state cookie.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the value is fixed.
    pub fn clear_oauth_state(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let cookie = Cookie::build((OAUTH_STATE_COOKIE_NAME, ""))
            .http_only(true)
            .secure(self.secure())
            .same_site(SameSite::Lax)
            .path("/auth/google")
            .max_age(cookie::time::Duration::ZERO)
            .build();
        HeaderValue::from_str(&cookie.to_string())
    }
}

/// Read a named cookie from all `Cookie` headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
        .filter(|value| !value.is_empty())
}

/// Extract the session token: the `token` cookie first, then a bearer header.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, SESSION_COOKIE_NAME).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cookies(mode: CookieMode, domain: Option<&str>) -> SessionCookies {
        SessionCookies::new(
            &CookieConfig {
                mode,
                domain: domain.map(str::to_owned),
            },
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn test_hardened_cookie_attributes() {
        let value = cookies(CookieMode::Hardened, Some("example.com"))
            .issue("abc.def.ghi")
            .unwrap();
        let value = value.to_str().unwrap();

        assert!(value.starts_with("token=abc.def.ghi"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Secure"));
        assert!(value.contains("SameSite=None"));
        assert!(value.contains("Path=/"));
        assert!(value.contains("Max-Age=3600"));
        assert!(value.contains("Domain=example.com"));
    }

    #[test]
    fn test_relaxed_cookie_attributes() {
        let value = cookies(CookieMode::Relaxed, None).issue("t").unwrap();
        let value = value.to_str().unwrap();

        assert!(value.contains("HttpOnly"));
        assert!(!value.contains("Secure"));
        assert!(value.contains("SameSite=Lax"));
        assert!(!value.contains("Domain="));
    }

    #[test]
    fn test_clear_emits_matching_and_past_dated_cookies() {
        let session = cookies(CookieMode::Hardened, Some("example.com"));
        let issued = session.issue("t").unwrap();
        let [expired, past_dated] = session.clear().unwrap();
        let expired = expired.to_str().unwrap();
        let past_dated = past_dated.to_str().unwrap();

        assert!(expired.starts_with("token=;"));
        assert!(expired.contains("Max-Age=0"));
        assert!(!expired.contains("Expires="));

        assert!(past_dated.starts_with("token=;"));
        assert!(past_dated.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(!past_dated.contains("Max-Age"));

        for attribute in ["HttpOnly", "Secure", "SameSite=None", "Path=/", "Domain=example.com"] {
            assert!(issued.to_str().unwrap().contains(attribute));
            assert!(expired.contains(attribute), "{attribute} missing on clear");
            assert!(past_dated.contains(attribute), "{attribute} missing on fallback");
        }
    }

    #[test]
    fn test_session_token_prefers_cookie_then_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));

        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; token=from-cookie"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_session_token_absent() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("token="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(session_token(&headers).is_none());
    }

    #[test]
    fn test_oauth_state_cookie_is_scoped() {
        let value = cookies(CookieMode::Relaxed, None).oauth_state("xyz").unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("oauth_state=xyz"));
        assert!(value.contains("Path=/auth/google"));
        assert!(value.contains("Max-Age=600"));
    }
}
