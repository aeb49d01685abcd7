//! Data the page renderer needs on every page and after a guard redirect.

use axum::{
    Extension, Json,
    extract::Query,
};
use serde::{Deserialize, Serialize};

use crate::{
    gateway::{
        access::{AccessCookieState, RequestContext},
        guard::sanitize_target,
    },
    reconcile::Credentials,
};

const NAVBAR_ITEMS: [&str; 4] = ["admin", "settings", "home", "dashboard"];
const ADMIN_ITEM: &str = "admin";

#[derive(Debug, Serialize)]
pub struct LayoutData {
    pub navbar_items: Vec<&'static str>,
    pub credentials: Option<Credentials>,
    pub access_state: AccessCookieState,
}

#[must_use]
pub fn navbar_items(context: &RequestContext) -> Vec<&'static str> {
    let root = context.is_root();
    NAVBAR_ITEMS
        .into_iter()
        .filter(|item| root || *item != ADMIN_ITEM)
        .collect()
}

/// `GET /session`
pub async fn session(Extension(context): Extension<RequestContext>) -> Json<LayoutData> {
    Json(LayoutData {
        navbar_items: navbar_items(&context),
        credentials: Credentials::from_context(&context),
        access_state: context.access_state,
    })
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RedirectData {
    pub credentials: Option<Credentials>,
    pub access_cookie_state: AccessCookieState,
    pub to: String,
}

/// `GET /redirect?to=<path>`
pub async fn redirect(
    Extension(context): Extension<RequestContext>,
    Query(query): Query<RedirectQuery>,
) -> Json<RedirectData> {
    Json(RedirectData {
        credentials: Credentials::from_context(&context),
        access_cookie_state: context.access_state,
        to: sanitize_target(query.to.as_deref()),
    })
}
