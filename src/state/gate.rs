//! Auth gate — run an action now, or after the user signs in.
//!
//! Any component may wrap a user-initiated operation in [`AuthGate::gate`]:
//! authenticated sessions run it immediately, anonymous ones see the auth
//! overlay with the action attached. Overlay success runs the action exactly
//! once (see `SessionStore::resolve_overlay_success`); dismissal drops it.

use crate::state::session::{DeferredActionError, SessionAction, SessionStore};

#[derive(Clone)]
pub struct AuthGate {
    store: SessionStore,
}

impl AuthGate {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Execute `action` immediately when a session exists; otherwise defer it
    /// behind the auth overlay. Only one action may be pending — a second
    /// `gate` call while one waits replaces it (last caller wins).
    ///
    /// Action errors are logged and swallowed on both paths; `gate` itself
    /// never fails.
    pub fn gate<F>(&self, action: F)
    where
        F: FnOnce() -> Result<(), DeferredActionError> + Send + 'static,
    {
        if self.store.is_authenticated() {
            if let Err(e) = action() {
                tracing::warn!(error = %e, "gated action failed");
            }
            return;
        }

        let id = self.store.register_action(Box::new(action));
        self.store.dispatch(SessionAction::ShowAuthOverlay(Some(id)));
    }

    /// Explicit overlay dismissal: hide it and drop the pending action
    /// without invoking it.
    pub fn dismiss(&self) {
        self.store.dispatch(SessionAction::HideAuthOverlay);
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
