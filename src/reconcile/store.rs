use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::gateway::{AccessCookieState, RequestContext, upstream::UserData};

/// What the browser store is hydrated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub data: UserData,
    pub token_expiry: i64,
}

impl Credentials {
    /// Credentials the server can vouch for; only a resolved identity counts.
    #[must_use]
    pub fn from_context(context: &RequestContext) -> Option<Self> {
        if context.access_state != AccessCookieState::LoggedIn {
            return None;
        }
        context.identity.as_ref().map(|identity| Self {
            data: UserData {
                name: identity.profile.name.clone(),
            },
            token_expiry: identity.claims.exp,
        })
    }
}

/// Reactive credential store; presentation code subscribes to changes.
#[derive(Debug)]
pub struct CredentialStore {
    tx: watch::Sender<Option<Credentials>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }
}

impl CredentialStore {
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Credentials>> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<Credentials> {
        self.tx.borrow().clone()
    }

    pub fn hydrate(&self, credentials: Credentials) {
        self.tx.send_replace(Some(credentials));
    }

    pub fn set_expiry(&self, token_expiry: i64) {
        self.tx.send_if_modified(|held| match held {
            Some(credentials) if credentials.token_expiry != token_expiry => {
                credentials.token_expiry = token_expiry;
                true
            }
            _ => false,
        });
    }

    pub fn clear(&self) {
        self.tx.send_if_modified(|held| held.take().is_some());
    }
}
