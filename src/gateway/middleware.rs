use axum::{
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::debug;

use super::{
    GatewayState, access, client_ip,
    cookies::{self, ACCESS_TOKEN},
    guard::{self, GuardDecision, NOT_FOUND_PATH},
    proxy::Proxied,
};
use crate::token::unix_now;

/// Resolve the access cookie, apply the guard, then remap not-found responses.
pub async fn session(
    State(state): State<Arc<GatewayState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie = cookies::read(request.headers(), ACCESS_TOKEN);
    let client = client_ip(connect.as_ref());
    let resolution = access::resolve(&state, cookie.as_deref(), client, unix_now()).await;
    debug!(state = ?resolution.context.access_state, "resolved access state");

    let path = request.uri().path().to_string();
    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.as_str().to_string());
    let mut response = match guard::check(&target, &resolution.context) {
        GuardDecision::Allow => {
            request.extensions_mut().insert(resolution.context);
            let response = next.run(request).await;
            if response.status() == StatusCode::NOT_FOUND
                && path != NOT_FOUND_PATH
                && response.extensions().get::<Proxied>().is_none()
            {
                Redirect::to(NOT_FOUND_PATH).into_response()
            } else {
                response
            }
        }
        GuardDecision::Redirect(target) => {
            debug!(%path, %target, "guard redirect");
            Redirect::to(&target).into_response()
        }
    };

    // Handlers that write credentials themselves win over the scrub.
    if resolution.scrub_cookies && !response.headers().contains_key(SET_COOKIE) {
        for cookie in state.cookies().scrub() {
            response.headers_mut().append(SET_COOKIE, cookie);
        }
    }
    response
}
