//! Per-request trust classification.
//!
//! Runs once for every inbound request, before the guard and before any
//! handler. The access cookie is decoded without verification; authenticity
//! is delegated to the upstream API, which checks the raw token whenever a
//! profile has to be fetched for it.

use serde::Serialize;
use std::{net::IpAddr, sync::Arc};
use tracing::{debug, warn};

use super::{GatewayState, cookies::NULL_SENTINEL};
use crate::{
    profile::UserProfile,
    token::{Claims, decode_unverified, is_expired, seconds_until},
};

/// Seconds before `exp` at which a token stops being looked up server side.
pub const EXPIRY_LEEWAY_SECONDS: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessCookieState {
    /// No access cookie at all.
    New,
    /// A cookie exists but yields no usable identity.
    Visitor,
    LoggedIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub profile: UserProfile,
    pub claims: Claims,
}

impl RequestIdentity {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.profile.is_root()
    }
}

/// Resolved state for one request. Cloning shares the identity.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub access_state: AccessCookieState,
    pub identity: Option<Arc<RequestIdentity>>,
}

impl RequestContext {
    #[must_use]
    pub const fn anonymous(access_state: AccessCookieState) -> Self {
        Self {
            access_state,
            identity: None,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.identity.as_ref().is_some_and(|id| id.is_root())
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub context: RequestContext,
    /// Both credential cookies must be overwritten with the sentinel.
    pub scrub_cookies: bool,
}

impl Resolution {
    const fn keep(context: RequestContext) -> Self {
        Self {
            context,
            scrub_cookies: false,
        }
    }
}

/// Classify the access cookie `cookie` at unix time `now`.
pub async fn resolve(
    state: &GatewayState,
    cookie: Option<&str>,
    client: Option<IpAddr>,
    now: i64,
) -> Resolution {
    let Some(raw) = cookie else {
        return Resolution::keep(RequestContext::anonymous(AccessCookieState::New));
    };

    let claims = if raw == NULL_SENTINEL {
        None
    } else {
        decode_unverified(raw)
    };
    let Some(claims) = claims else {
        debug!("access cookie unusable, visitor");
        return Resolution::keep(RequestContext::anonymous(AccessCookieState::Visitor));
    };

    if is_expired(claims.exp, EXPIRY_LEEWAY_SECONDS, now) {
        // The browser holds the refresh cookie and renews on its own.
        debug!(exp = claims.exp, "access token near expiry, optimistic login");
        return Resolution::keep(RequestContext::anonymous(AccessCookieState::LoggedIn));
    }

    let key = claims.cache_key();
    let profile = match state.profiles().get(key) {
        Some(profile) => Some(profile),
        None => match state
            .upstream()
            .fetch_profile(&claims.sub, &claims.raw_token, client)
            .await
        {
            Ok(profile) => {
                state
                    .profiles()
                    .set(key, profile.clone(), seconds_until(claims.exp, now).max(0));
                Some(profile)
            }
            Err(err) => {
                warn!("profile fetch failed: {err}");
                None
            }
        },
    };

    match profile {
        Some(profile) => Resolution::keep(RequestContext {
            access_state: AccessCookieState::LoggedIn,
            identity: Some(Arc::new(RequestIdentity { profile, claims })),
        }),
        None => Resolution {
            context: RequestContext::anonymous(AccessCookieState::Visitor),
            scrub_cookies: true,
        },
    }
}
