//! Process-wide session state with a single writer.
//!
//! All mutation goes through [`SessionStore`], which publishes every change
//! on a watch channel so other tasks can observe forced logouts without
//! polling shared mutable state.

use tokio::sync::watch;

/// Snapshot of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
  pub logged_in: bool,
  pub username: String,
  /// Opaque bearer token returned by login, attached to every request
  pub token: String,
}

/// Single-writer holder for session state.
///
/// Readers take snapshots or subscribe to the change stream; the store is
/// the only place that writes.
pub struct SessionStore {
  tx: watch::Sender<SessionState>,
}

impl SessionStore {
  /// Create a store in the logged-out state.
  pub fn new() -> Self {
    let (tx, _) = watch::channel(SessionState::default());
    Self { tx }
  }

  /// Record a successful login (or a restore from stored credentials).
  pub fn set_logged_in(&self, username: &str, token: &str) {
    self.tx.send_replace(SessionState {
      logged_in: true,
      username: username.to_string(),
      token: token.to_string(),
    });
  }

  /// Clear the session. Used for explicit logout and for the global 403
  /// hook in the catalog client.
  pub fn clear(&self) {
    self.tx.send_replace(SessionState::default());
  }

  /// Current state, cloned at call time.
  pub fn snapshot(&self) -> SessionState {
    self.tx.borrow().clone()
  }

  pub fn is_logged_in(&self) -> bool {
    self.tx.borrow().logged_in
  }

  /// Token to attach to outgoing requests. Empty when logged out.
  pub fn token(&self) -> String {
    self.tx.borrow().token.clone()
  }

  /// Subscribe to session changes.
  pub fn subscribe(&self) -> watch::Receiver<SessionState> {
    self.tx.subscribe()
  }
}

impl Default for SessionStore {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn login_then_clear() {
    let store = SessionStore::new();
    assert!(!store.is_logged_in());

    store.set_logged_in("alice", "abc");
    let state = store.snapshot();
    assert!(state.logged_in);
    assert_eq!(state.username, "alice");
    assert_eq!(state.token, "abc");

    store.clear();
    assert_eq!(store.snapshot(), SessionState::default());
  }

  #[tokio::test]
  async fn subscribers_observe_forced_logout() {
    let store = SessionStore::new();
    store.set_logged_in("alice", "abc");

    let mut rx = store.subscribe();
    store.clear();

    rx.changed().await.unwrap();
    assert!(!rx.borrow().logged_in);
  }
}
