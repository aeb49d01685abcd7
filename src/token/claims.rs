//! Unverified token decoding.
//!
//! Nothing here checks a signature. The per-request hot path only needs the
//! expiry and a cache key; authenticity is re-established by the upstream API
//! whenever the raw token is presented to it.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::Error;

/// Decoded token payload plus the raw token it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub aud: Vec<String>,
    #[serde(skip)]
    pub raw_token: String,
}

impl Claims {
    /// Cache key of the token these claims were decoded from.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        signature_segment(&self.raw_token)
    }
}

/// Substring after the last `.`; the whole input when there is none.
#[must_use]
pub fn signature_segment(token: &str) -> &str {
    token.rfind('.').map_or(token, |idx| &token[idx + 1..])
}

/// Decode the payload segment without verifying anything.
///
/// Returns `None` for any malformed input.
#[must_use]
pub fn decode_unverified(token: &str) -> Option<Claims> {
    match try_decode(token) {
        Ok(claims) => Some(claims),
        Err(_) => None,
    }
}

pub(crate) fn try_decode(token: &str) -> Result<Claims, Error> {
    let mut parts = token.split('.');
    let _header = parts.next().ok_or(Error::TokenFormat)?;
    let payload = parts.next().ok_or(Error::TokenFormat)?;
    let signature = parts.next().ok_or(Error::TokenFormat)?;
    if parts.next().is_some() || payload.is_empty() || signature.is_empty() {
        return Err(Error::TokenFormat);
    }

    let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('='))
        .map_err(|_| Error::Base64)?;
    let mut claims: Claims = serde_json::from_slice(&bytes)?;
    claims.raw_token = token.to_string();
    Ok(claims)
}

/// Current unix time in seconds.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// Seconds left until `exp`.
#[must_use]
pub const fn seconds_until(exp: i64, now: i64) -> i64 {
    exp.saturating_sub(now)
}

/// `true` once `exp` is closer than `leeway` seconds (or already past).
#[must_use]
pub const fn is_expired(exp: i64, leeway: i64, now: i64) -> bool {
    exp.saturating_sub(leeway) < now
}
