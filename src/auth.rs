//! Authentication session: who the current principal is, and a broadcast
//! channel for principal changes.
//!
//! Task visibility is computed per principal, so anything holding a task
//! snapshot must re-list when the session changes. Subscribers watch the
//! session instead of polling; a `None` value means signed out.

use tokio::sync::watch;

use crate::config::Config;
use crate::error::Result;
use crate::principal::Principal;

/// Source of authenticated principals
pub trait AuthProvider: Send + Sync {
    /// Resolve a trusted selector (id, email, or employee id) to a principal.
    fn authenticate(&self, selector: &str) -> Result<Principal>;
}

/// Provider backed by the `[[users]]` table in `taskhub.toml`
pub struct ConfigAuthProvider {
    config: Config,
}

impl ConfigAuthProvider {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl AuthProvider for ConfigAuthProvider {
    fn authenticate(&self, selector: &str) -> Result<Principal> {
        self.config.principal(selector)
    }
}

/// Current sign-in state with change notification
pub struct AuthSession<P: AuthProvider> {
    provider: P,
    tx: watch::Sender<Option<Principal>>,
}

impl<P: AuthProvider> AuthSession<P> {
    pub fn new(provider: P) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { provider, tx }
    }

    /// Authenticate and make the principal current. Subscribers observe the
    /// change even when the same principal signs in again.
    pub fn sign_in(&self, selector: &str) -> Result<Principal> {
        let principal = self.provider.authenticate(selector)?;
        self.tx.send_replace(Some(principal.clone()));
        Ok(principal)
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<Principal> {
        self.tx.borrow().clone()
    }

    /// Watch for principal changes. The receiver starts marked changed so a
    /// new subscriber always sees the current value first.
    ///
    /// The session only broadcasts; re-running listings against the new
    /// principal is the subscriber's job. One-shot CLI invocations sign in
    /// once and never need this; long-lived embedders do.
    pub fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }
}
