//! # Vakt (session gateway)
//!
//! `vakt` sits between browsers and the internal API. For every request it
//! classifies the caller from the `access_token` cookie into one of three trust
//! states and, when possible, attaches the caller's profile:
//!
//! - **NEW**: no cookie at all; the client should try a silent refresh.
//! - **VISITOR**: the cookie holds the `null` sentinel or cannot be used.
//! - **LOGGED_IN**: the token is structurally valid and not (about to be)
//!   expired; the profile comes from a TTL cache keyed by the token signature.
//!
//! Page routes are guarded on top of that classification (`/admin` requires
//! the root role), API calls are proxied to the internal origin with the real
//! client address stamped, and login/logout exchange credentials for cookies.
//!
//! The [`reconcile`] module holds the browser side counterpart: a small state
//! machine that renews tokens and keeps a reactive credential store in sync.

pub mod cache;
pub mod cli;
pub mod gateway;
pub mod profile;
pub mod reconcile;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
