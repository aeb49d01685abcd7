//! Path based authorization.

use url::form_urlencoded;

use super::access::{AccessCookieState, RequestContext};

pub const ADMIN_PREFIX: &str = "/admin";
pub const HOME_PATH: &str = "/";
pub const REAUTH_PATH: &str = "/redirect";
pub const NOT_FOUND_PATH: &str = "/404_narnia";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// `true` for `/admin` and anything below it, per path segment.
#[must_use]
pub fn is_protected(path: &str) -> bool {
    path.strip_prefix(ADMIN_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// `target` is the request path with its query, if any. Only the path decides
/// protection; the whole target is carried in `to`.
#[must_use]
pub fn check(target: &str, context: &RequestContext) -> GuardDecision {
    let path = target.split_once('?').map_or(target, |(path, _)| path);
    if !is_protected(path) || context.is_root() {
        return GuardDecision::Allow;
    }
    if context.access_state == AccessCookieState::LoggedIn {
        // After a refresh the browser is sent back to `to`.
        GuardDecision::Redirect(format!("{REAUTH_PATH}?to={}", encode_target(target)))
    } else {
        GuardDecision::Redirect(HOME_PATH.to_string())
    }
}

/// Form-encode a local target for a query value. `/` stays literal.
fn encode_target(target: &str) -> String {
    form_urlencoded::byte_serialize(target.as_bytes())
        .collect::<String>()
        .replace("%2F", "/")
}

/// Local path to bounce back to; anything else collapses to home.
#[must_use]
pub fn sanitize_target(to: Option<&str>) -> String {
    match to.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => HOME_PATH.to_string(),
    }
}
