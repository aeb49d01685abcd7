//! Login, logout and cache invalidation.

use axum::{
    Extension, Form,
    extract::ConnectInfo,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, error, info, warn};

use crate::{
    gateway::{
        GatewayState,
        access::{AccessCookieState, RequestContext},
        client_ip,
        cookies::{self, ACCESS_TOKEN, NULL_SENTINEL, REFRESH_TOKEN},
        guard::{HOME_PATH, sanitize_target},
        upstream::UpstreamError,
    },
    token::{KeyClass, decode_unverified, seconds_until, signature_segment, unix_now},
};

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub form_user: Option<String>,
    #[serde(default)]
    pub form_pwd: Option<SecretString>,
    #[serde(default)]
    pub form_remember: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl LoginForm {
    fn remember(&self) -> bool {
        self.form_remember.as_deref() == Some("1")
    }
}

fn upstream_failure(err: &UpstreamError) -> Response {
    match err {
        UpstreamError::Status { status, body } => (*status, body.clone()).into_response(),
        UpstreamError::Transport(_) | UpstreamError::Decode(_) | UpstreamError::Path(_) => {
            (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response()
        }
    }
}

/// `POST /login`
pub async fn login(
    Extension(state): Extension<Arc<GatewayState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    Form(form): Form<LoginForm>,
) -> Response {
    let name = form.form_user.as_deref().unwrap_or_default();
    let pwd = form
        .form_pwd
        .as_ref()
        .map_or("", |pwd| pwd.expose_secret());
    if name.is_empty() || pwd.is_empty() {
        return (StatusCode::BAD_REQUEST, "invalid name or empty password").into_response();
    }
    let client = client_ip(connect.as_ref());

    let pair = match state.upstream().login(name, pwd, client).await {
        Ok(pair) => pair,
        Err(err) => {
            warn!("login rejected: {err}");
            return upstream_failure(&err);
        }
    };

    let Some(sub) = state.keys().verify(&pair.access_token, KeyClass::Access) else {
        error!("upstream issued an access token that does not verify");
        return (StatusCode::BAD_GATEWAY, "invalid token from upstream").into_response();
    };
    let Some(claims) = decode_unverified(&pair.access_token) else {
        return (StatusCode::BAD_GATEWAY, "invalid token from upstream").into_response();
    };

    let profile = match state
        .upstream()
        .fetch_profile(&sub, &pair.access_token, client)
        .await
    {
        Ok(profile) => profile,
        Err(err) => {
            error!("profile fetch after login failed: {err}");
            return upstream_failure(&err);
        }
    };

    let now = unix_now();
    let access_ttl = seconds_until(claims.exp, now).max(0);
    state
        .profiles()
        .set(claims.cache_key(), profile, access_ttl);

    let remember = form.remember();
    let refresh_ttl = decode_unverified(&pair.refresh_token)
        .map(|refresh| seconds_until(refresh.exp, now).max(0));
    let policy = state.cookies();
    let mut headers = HeaderMap::new();
    for cookie in [
        policy.access(&pair.access_token, remember.then_some(access_ttl)),
        policy.refresh(&pair.refresh_token, refresh_ttl.filter(|_| remember)),
    ] {
        match cookie {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(err) => {
                error!("cannot encode credential cookie: {err}");
                return (StatusCode::BAD_GATEWAY, "invalid token from upstream").into_response();
            }
        }
    }

    info!(sub = %sub, remember, "login succeeded");
    (headers, Redirect::to(&sanitize_target(form.to.as_deref()))).into_response()
}

/// `POST /logout`
pub async fn logout(
    Extension(state): Extension<Arc<GatewayState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request_headers: HeaderMap,
) -> Response {
    let access = cookies::read(&request_headers, ACCESS_TOKEN).filter(|v| v != NULL_SENTINEL);
    if let Some(token) = access {
        let refresh = cookies::read(&request_headers, REFRESH_TOKEN).filter(|v| v != NULL_SENTINEL);
        if let Err(err) = state
            .upstream()
            .logout(&token, refresh.as_deref(), client_ip(connect.as_ref()))
            .await
        {
            warn!("upstream logout failed: {err}");
        }
        state.profiles().delete(signature_segment(&token));
    }

    // Always clear the cookies, even when there was nothing to revoke.
    let mut headers = HeaderMap::new();
    for cookie in state.cookies().delete() {
        headers.append(SET_COOKIE, cookie);
    }
    debug!("logged out");
    (headers, Redirect::to(HOME_PATH)).into_response()
}

/// `GET /invalidate_cache`
pub async fn invalidate_cache(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(context): Extension<RequestContext>,
    request_headers: HeaderMap,
) -> Redirect {
    if context.access_state == AccessCookieState::LoggedIn {
        if let Some(token) = cookies::read(&request_headers, ACCESS_TOKEN) {
            state.profiles().delete(signature_segment(&token));
        }
    }
    Redirect::to(HOME_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_requires_literal_one() {
        let mut form = LoginForm::default();
        assert!(!form.remember());
        form.form_remember = Some("on".into());
        assert!(!form.remember());
        form.form_remember = Some("1".into());
        assert!(form.remember());
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let form = LoginForm {
            form_user: Some("bjorn".into()),
            form_pwd: Some(SecretString::from("hunter2")),
            ..LoginForm::default()
        };
        assert!(!format!("{form:?}").contains("hunter2"));
    }

    #[test]
    fn upstream_status_passes_through() {
        let response = upstream_failure(&UpstreamError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: r#"{"detail":"bad credentials"}"#.into(),
        });
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = upstream_failure(&UpstreamError::Decode("eof".into()));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
