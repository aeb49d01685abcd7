//! Administration pages. The guard has already required the root role.

use axum::{
    Extension, Json,
    extract::ConnectInfo,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tracing::warn;

use crate::gateway::{
    GatewayState,
    access::RequestContext,
    client_ip,
    guard::HOME_PATH,
    upstream::User,
};

pub const ROWS_PER_PAGE: u32 = 10;

#[derive(Debug, Serialize)]
pub struct UsersPage {
    pub rows_per_page: u32,
    pub users: Vec<User>,
    pub users_count: u64,
    pub services: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub rows_per_page: u32,
    pub services: Vec<String>,
}

fn root_token(context: &RequestContext) -> Option<String> {
    context
        .identity
        .as_ref()
        .filter(|identity| identity.is_root())
        .map(|identity| identity.claims.raw_token.clone())
}

/// `GET /admin/users`
pub async fn users(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(context): Extension<RequestContext>,
    connect: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let Some(token) = root_token(&context) else {
        return Redirect::to(HOME_PATH).into_response();
    };
    let client = client_ip(connect.as_ref());
    let upstream = state.upstream();

    let (users, count, services) = tokio::join!(
        upstream.list_users(&token, ROWS_PER_PAGE, client),
        upstream.total_users(&token, client),
        state
            .services()
            .get_or_refresh(|| upstream.service_names(&token, client)),
    );

    match (users, count) {
        (Ok(users), Ok(users_count)) => Json(UsersPage {
            rows_per_page: ROWS_PER_PAGE,
            users,
            users_count,
            services,
        })
        .into_response(),
        (Err(err), _) | (_, Err(err)) => {
            warn!("admin user listing failed: {err}");
            Redirect::to(HOME_PATH).into_response()
        }
    }
}

/// `GET /admin/users/search`
pub async fn search(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(context): Extension<RequestContext>,
    connect: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let Some(token) = root_token(&context) else {
        return Redirect::to(HOME_PATH).into_response();
    };
    let client = client_ip(connect.as_ref());
    let upstream = state.upstream();
    let services = state
        .services()
        .get_or_refresh(|| upstream.service_names(&token, client))
        .await;
    Json(SearchPage {
        rows_per_page: ROWS_PER_PAGE,
        services,
    })
    .into_response()
}
