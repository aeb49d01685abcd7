//! Public-to-internal API rewrite and the browser pass-through route.

use axum::{
    Extension,
    body::{Body, to_bytes},
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tracing::{debug, warn};
use url::Url;

use super::{
    GatewayState, client_ip,
    upstream::{ForwardRequest, UpstreamError},
};

pub const IP_HEADER: &str = "x-real-ip";

const MAX_FORWARD_BODY: usize = 2 * 1024 * 1024;

const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TE,
];

/// Marks responses produced by the pass-through so the not-found remap leaves
/// upstream 404s alone.
#[derive(Clone, Copy, Debug)]
pub struct Proxied;

#[derive(Clone, Debug)]
pub struct ApiProxy {
    public: Url,
    internal: Url,
}

impl ApiProxy {
    #[must_use]
    pub fn new(public: Url, internal: Url) -> Self {
        Self { public, internal }
    }

    #[must_use]
    pub fn public(&self) -> &Url {
        &self.public
    }

    /// Swap the public origin prefix for the internal one. Other URLs are
    /// returned unchanged.
    #[must_use]
    pub fn rewrite(&self, url: &str) -> String {
        url.strip_prefix(self.public.as_str()).map_or_else(
            || url.to_string(),
            |rest| format!("{}{rest}", self.internal.as_str()),
        )
    }

    /// Replace any client supplied address header with the connection peer.
    pub fn stamp_client(&self, headers: &mut HeaderMap, client: Option<IpAddr>) {
        headers.remove(IP_HEADER);
        if let Some(ip) = client {
            if let Ok(value) = HeaderValue::from_str(&ip.to_string()) {
                headers.insert(IP_HEADER, value);
            }
        }
    }
}

/// Dot segments (plain or percent-encoded) and backslashes never reach the API.
fn is_forwardable(path: &str) -> bool {
    !path.contains('\\')
        && path.split('/').all(|segment| {
            let segment = segment.to_ascii_lowercase().replace("%2e", ".");
            segment != "." && segment != ".."
        })
}

/// `ANY /api/*path` and `ANY /auth/*path`.
pub async fn forward(
    Extension(state): Extension<Arc<GatewayState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();
    let upstream_path = path.strip_prefix("/api").unwrap_or(path);
    if !is_forwardable(upstream_path) {
        debug!(%path, "refusing to forward path");
        return (StatusCode::BAD_REQUEST, "invalid api path").into_response();
    }
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{upstream_path}?{query}"),
        None => upstream_path.to_string(),
    };

    let body = match to_bytes(body, MAX_FORWARD_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("rejecting proxied body: {err}");
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    let mut headers = parts.headers;
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }

    let forwarded = state
        .upstream()
        .forward(ForwardRequest {
            method: parts.method,
            path_and_query,
            headers,
            body,
            client: client_ip(connect.as_ref()),
        })
        .await;

    let mut response = match forwarded {
        Ok(upstream) => {
            let mut response = Response::new(Body::from(upstream.body));
            *response.status_mut() = upstream.status;
            let mut headers = upstream.headers;
            for name in &HOP_BY_HOP {
                headers.remove(name);
            }
            *response.headers_mut() = headers;
            response
        }
        Err(err @ UpstreamError::Path(_)) => {
            debug!("api pass-through refused: {err}");
            (StatusCode::BAD_REQUEST, "invalid api path").into_response()
        }
        Err(err) => {
            warn!("api pass-through failed: {err}");
            (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response()
        }
    };
    response.extensions_mut().insert(Proxied);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy() -> ApiProxy {
        ApiProxy::new(
            Url::parse("http://bjorn.lan:8888").expect("public"),
            Url::parse("http://127.0.0.1:8888/").expect("internal"),
        )
    }

    #[test]
    fn rewrites_public_origin_only() {
        let proxy = proxy();
        assert_eq!(
            proxy.rewrite("http://bjorn.lan:8888/user/u1/app"),
            "http://127.0.0.1:8888/user/u1/app"
        );
        assert_eq!(
            proxy.rewrite("http://elsewhere.lan/user"),
            "http://elsewhere.lan/user"
        );
        assert_eq!(
            proxy.rewrite("http://bjorn.lan:8889/user"),
            "http://bjorn.lan:8889/user"
        );
    }

    #[test]
    fn dot_segments_are_not_forwardable() {
        assert!(is_forwardable("/user/u1/app"));
        assert!(is_forwardable("/files/v1.2/readme"));
        assert!(is_forwardable("/http://127.0.0.1:9/steal"));
        assert!(!is_forwardable("/../admin"));
        assert!(!is_forwardable("/user/./app"));
        assert!(!is_forwardable("/%2E%2e/admin"));
        assert!(!is_forwardable("/.%2e"));
        assert!(!is_forwardable("/\\evil.lan/user"));
    }

    #[test]
    fn client_address_overrides_spoofed_header() {
        let proxy = proxy();
        let mut headers = HeaderMap::new();
        headers.insert(IP_HEADER, HeaderValue::from_static("6.6.6.6"));
        proxy.stamp_client(&mut headers, Some("10.0.0.7".parse().expect("ip")));
        assert_eq!(headers.get(IP_HEADER), Some(&HeaderValue::from_static("10.0.0.7")));
        assert_eq!(headers.get_all(IP_HEADER).iter().count(), 1);
    }

    #[test]
    fn unknown_client_drops_spoofed_header() {
        let proxy = proxy();
        let mut headers = HeaderMap::new();
        headers.insert(IP_HEADER, HeaderValue::from_static("6.6.6.6"));
        proxy.stamp_client(&mut headers, None);
        assert!(headers.get(IP_HEADER).is_none());
    }
}
