use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::ports::AuthStateStore;
use crate::domain::session::{AuthState, User};

/// Auth state shared between the session workflows and anything that gates
/// on it. Each write replaces the whole state, and subscribers see every
/// change.
#[derive(Clone)]
pub struct WatchAuthStore {
    tx: Arc<watch::Sender<AuthState>>,
}

impl WatchAuthStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }
}

impl Default for WatchAuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStateStore for WatchAuthStore {
    fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    fn set_authenticated(&self, user: User) {
        tracing::debug!(user_id = user.id, "auth state set");
        self.tx.send_replace(AuthState::authenticated(user));
    }

    fn clear(&self) {
        if self.tx.borrow().is_authenticated() {
            tracing::debug!("auth state cleared");
        }
        self.tx.send_replace(AuthState::default());
    }
}
