//! Credential cookies.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};

pub const ACCESS_TOKEN: &str = "access_token";
pub const REFRESH_TOKEN: &str = "refresh_token";

/// Explicit "known invalid" value, distinct from an absent cookie.
pub const NULL_SENTINEL: &str = "null";

pub const ACCESS_PATH: &str = "/";
pub const REFRESH_PATH: &str = "/auth";

/// Value of cookie `name` from the request `Cookie` header(s).
#[must_use]
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            if key.trim() == name {
                return Some(val.trim().to_string());
            }
        }
    }
    None
}

/// Attributes shared by every cookie the gateway emits.
#[derive(Clone, Debug, Default)]
pub struct CookiePolicy {
    domain: Option<String>,
    secure: bool,
}

impl CookiePolicy {
    #[must_use]
    pub fn new(domain: Option<String>, secure: bool) -> Self {
        let domain = domain
            .map(|d| d.trim().trim_start_matches('.').to_string())
            .filter(|d| !d.is_empty());
        Self { domain, secure }
    }

    /// `Set-Cookie` value; `max_age` of `None` makes a session cookie.
    ///
    /// # Errors
    /// Returns an error if the value contains bytes not allowed in a header.
    pub fn set(
        &self,
        name: &str,
        value: &str,
        path: &str,
        max_age: Option<i64>,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{name}={value}; Path={path}; HttpOnly; SameSite=Lax");
        if let Some(seconds) = max_age {
            cookie.push_str(&format!("; Max-Age={}", seconds.max(0)));
        }
        self.finish(cookie)
    }

    pub fn access(&self, token: &str, max_age: Option<i64>) -> Result<HeaderValue, InvalidHeaderValue> {
        self.set(ACCESS_TOKEN, token, ACCESS_PATH, max_age)
    }

    pub fn refresh(&self, token: &str, max_age: Option<i64>) -> Result<HeaderValue, InvalidHeaderValue> {
        self.set(REFRESH_TOKEN, token, REFRESH_PATH, max_age)
    }

    /// Overwrite both credentials with the sentinel.
    #[must_use]
    pub fn scrub(&self) -> Vec<HeaderValue> {
        [
            self.access(NULL_SENTINEL, None),
            self.refresh(NULL_SENTINEL, None),
        ]
        .into_iter()
        .filter_map(Result::ok)
        .collect()
    }

    /// Expire both credentials.
    #[must_use]
    pub fn delete(&self) -> Vec<HeaderValue> {
        [(ACCESS_TOKEN, ACCESS_PATH), (REFRESH_TOKEN, REFRESH_PATH)]
            .into_iter()
            .filter_map(|(name, path)| self.set(name, "", path, Some(0)).ok())
            .collect()
    }

    fn finish(&self, mut cookie: String) -> Result<HeaderValue, InvalidHeaderValue> {
        if let Some(domain) = &self.domain {
            cookie.push_str(&format!("; Domain=.{domain}"));
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}
