use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    models::{NavigationDirective, SessionSnapshot},
    storage::StoreState,
};

/// Well-known key of the persisted session record.
pub const SESSION_KEY: &str = "isAuthenticated";

/// The only value the persisted record ever holds; absence means logged out.
const AUTHENTICATED_VALUE: &str = "true";

/// SessionService
///
/// Process-wide owner of the authentication flag. It is the single writer:
/// `login` and `logout` are the only mutation entry points, and every mutation is
/// pushed through a `watch` channel so that holders of a [`SessionView`] observe it
/// without polling.
///
/// The flag lives in the channel itself, so a read through any view after a
/// mutation returns is never stale.
pub struct SessionService {
    sender: watch::Sender<bool>,
    store: StoreState,
}

impl SessionService {
    /// restore
    ///
    /// Creates the service, restoring the flag from the persisted record. An
    /// unreadable store is treated as "no record".
    pub fn restore(store: StoreState) -> Self {
        let authenticated = match store.get(SESSION_KEY) {
            Ok(value) => value.as_deref() == Some(AUTHENTICATED_VALUE),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read persisted session, starting logged out");
                false
            }
        };

        tracing::info!(authenticated, "Session restored");

        let (sender, _) = watch::channel(authenticated);
        Self { sender, store }
    }

    pub fn is_authenticated(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            authenticated: self.is_authenticated(),
        }
    }

    /// Hands out a read-only, push-notified view of the flag.
    pub fn view(&self) -> SessionView {
        SessionView {
            receiver: self.sender.subscribe(),
        }
    }

    /// login
    ///
    /// Accepts any pair of non-empty credentials. On success the flag is set before
    /// persistence is attempted; a persistence failure is logged and otherwise ignored.
    /// Returns false, leaving the state untouched, when either input is empty.
    pub fn login(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            tracing::debug!("Login rejected: empty credentials");
            return false;
        }

        self.sender.send_replace(true);

        if let Err(e) = self.store.set(SESSION_KEY, AUTHENTICATED_VALUE) {
            tracing::warn!(error = %e, "Failed to persist session record");
        }

        tracing::info!(user = %username, "Session opened");
        true
    }

    /// logout
    ///
    /// Unconditionally clears the flag and the persisted record. Navigation is left to
    /// the caller, which receives a directive pointing at the root path.
    pub fn logout(&self) -> NavigationDirective {
        self.sender.send_replace(false);

        if let Err(e) = self.store.remove(SESSION_KEY) {
            tracing::warn!(error = %e, "Failed to clear persisted session record");
        }

        tracing::info!("Session closed");
        NavigationDirective::root()
    }
}

/// SessionView
///
/// Read-only handle on the session flag. Cloning is cheap; every clone sees
/// mutations as soon as the service applies them.
#[derive(Clone)]
pub struct SessionView {
    receiver: watch::Receiver<bool>,
}

impl SessionView {
    pub fn is_authenticated(&self) -> bool {
        *self.receiver.borrow()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            authenticated: self.is_authenticated(),
        }
    }

    /// Waits for the next mutation and returns the new value.
    ///
    /// Returns `None` once the owning service has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }
}

/// SessionState
///
/// Shared handle type for the session service inside the application state.
pub type SessionState = Arc<SessionService>;
