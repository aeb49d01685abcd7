//! HTTP front of the gateway.
//!
//! Every request passes through [`middleware::session`], which resolves the
//! access cookie into a [`RequestContext`], applies the route guard and
//! remaps not-found responses. Handlers read the context from the request
//! extensions and never mutate it.

pub mod access;
pub mod cookies;
pub mod guard;
pub(crate) mod handlers;
pub mod middleware;
pub mod proxy;
pub mod upstream;

mod state;

pub use access::{AccessCookieState, RequestContext, RequestIdentity};
pub use state::{GatewayConfig, GatewayState};

use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::{ConnectInfo, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::{any, get, post},
};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

use crate::cache;

/// Peer address of the TCP connection; never taken from headers.
#[must_use]
pub fn client_ip(connect: Option<&ConnectInfo<SocketAddr>>) -> Option<IpAddr> {
    connect.map(|ConnectInfo(addr)| addr.ip())
}

/// Build the gateway router.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/session", get(handlers::layout::session))
        .route("/redirect", get(handlers::layout::redirect))
        .route("/login", post(handlers::session::login))
        .route("/logout", post(handlers::session::logout))
        .route("/invalidate_cache", get(handlers::session::invalidate_cache))
        .route("/admin/users", get(handlers::admin::users))
        .route("/admin/users/search", get(handlers::admin::search))
        .route("/api/*path", any(proxy::forward))
        .route("/auth/*path", any(proxy::forward))
        .route(guard::NOT_FOUND_PATH, get(handlers::not_found))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, state: Arc<GatewayState>, sweep_every: Duration) -> Result<()> {
    let sweeper = cache::spawn_sweeper(state.profiles().clone(), sweep_every);

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.abort();
    info!("Gracefully shutdown");

    served?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("cannot listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
