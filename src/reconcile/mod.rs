//! Browser side session reconciliation.
//!
//! The server only classifies requests; renewing an access token is the
//! client's job because only the client holds the refresh cookie. This module
//! models that loop as explicit transitions over a [`CredentialStore`], driven
//! by one-shot results from a [`ClientApi`].

mod store;

pub use store::{CredentialStore, Credentials};

use std::{future::Future, pin::Pin};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    gateway::{AccessCookieState, access::EXPIRY_LEEWAY_SECONDS, upstream::UserData},
    token::is_expired,
};

pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send + 'a>>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("request rejected with status {0}")]
    Rejected(u16),
    #[error("request failed: {0}")]
    Unreachable(String),
}

/// Calls the browser makes with its own cookies attached.
pub trait ClientApi: Send + Sync {
    /// `GET auth/token`; returns the new access token expiry.
    fn refresh_token(&self) -> ClientFuture<'_, i64>;

    /// `GET user/self/data`.
    fn self_data(&self) -> ClientFuture<'_, UserData>;

    /// `GET auth/null_access`; turns both credential cookies into the sentinel.
    fn null_access(&self) -> ClientFuture<'_, ()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Server credentials were taken as is.
    Hydrated,
    /// A fresh token was obtained; reload so the server resolves it.
    Reload,
    RedirectToLogin,
    /// Settled as an anonymous visitor.
    Visitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshOutcome {
    Fresh,
    Refreshed,
    /// Nothing held; the call goes out unauthenticated.
    Anonymous,
    RedirectToLogin,
}

pub struct ClientSession<A> {
    api: A,
    store: CredentialStore,
    state: AccessCookieState,
}

impl<A: ClientApi> ClientSession<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            store: CredentialStore::default(),
            state: AccessCookieState::New,
        }
    }

    #[must_use]
    pub fn state(&self) -> AccessCookieState {
        self.state
    }

    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.store.current()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Credentials>> {
        self.store.subscribe()
    }

    /// Reconcile with the state the server resolved for this page load.
    pub async fn on_load(
        &mut self,
        server_state: AccessCookieState,
        credentials: Option<Credentials>,
    ) -> LoadOutcome {
        match (server_state, credentials) {
            (AccessCookieState::LoggedIn, Some(credentials)) => {
                self.store.hydrate(credentials);
                self.state = AccessCookieState::LoggedIn;
                LoadOutcome::Hydrated
            }
            (AccessCookieState::Visitor, _) => {
                self.settle_visitor();
                LoadOutcome::Visitor
            }
            (prior, _) => match self.renew().await {
                Ok(()) => LoadOutcome::Reload,
                Err(err) if prior == AccessCookieState::LoggedIn => {
                    debug!("renewal after login failed: {err}");
                    self.settle_visitor();
                    LoadOutcome::RedirectToLogin
                }
                Err(err) => {
                    debug!("no session to renew: {err}");
                    if let Err(err) = self.api.null_access().await {
                        warn!("failed to null credential cookies: {err}");
                    }
                    self.settle_visitor();
                    LoadOutcome::Visitor
                }
            },
        }
    }

    /// Make sure the held token outlives the next API call.
    pub async fn ensure_fresh(&mut self, now: i64) -> FreshOutcome {
        let Some(held) = self.store.current() else {
            return FreshOutcome::Anonymous;
        };
        if !is_expired(held.token_expiry, EXPIRY_LEEWAY_SECONDS, now) {
            return FreshOutcome::Fresh;
        }
        match self.api.refresh_token().await {
            Ok(expiry) => {
                self.store.set_expiry(expiry);
                FreshOutcome::Refreshed
            }
            Err(err) => {
                debug!("token refresh failed: {err}");
                self.settle_visitor();
                FreshOutcome::RedirectToLogin
            }
        }
    }

    async fn renew(&mut self) -> Result<(), ClientError> {
        let token_expiry = self.api.refresh_token().await?;
        let data = self.api.self_data().await?;
        self.store.hydrate(Credentials { data, token_expiry });
        self.state = AccessCookieState::LoggedIn;
        Ok(())
    }

    fn settle_visitor(&mut self) {
        self.store.clear();
        self.state = AccessCookieState::Visitor;
    }
}
