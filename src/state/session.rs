//! Session store — the process-wide reducer over shell state.
//!
//! DESIGN
//! ======
//! Every mutation is a typed [`SessionAction`] applied atomically under one
//! mutex, so "session present ⇔ token present" is never observable in a
//! half-applied state. `SetSession` and `ClearSession` persist through the
//! [`CredentialStore`] as a side effect of the transition itself.
//!
//! Deferred actions never live in the state tree: state carries an opaque
//! [`ActionId`] and the closures sit in a side table, keeping the state
//! comparable and its transitions well-defined. The store is a cheap-clone
//! handle (Arc interior) meant to be injected into every collaborator that
//! needs to dispatch — including ones outside any UI tree.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::credentials::CredentialStore;
use crate::net::types::UserRecord;

/// Error type a deferred action may report; logged, never propagated.
pub type DeferredActionError = Box<dyn std::error::Error + Send + Sync>;

/// A user-initiated operation deferred until after sign-in.
pub type DeferredAction = Box<dyn FnOnce() -> Result<(), DeferredActionError> + Send>;

/// Opaque handle to a registered deferred action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(u64);

/// The authenticated identity, or the absence of one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated(UserRecord),
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(record) => Some(record),
        }
    }
}

/// Transient app chrome visibility. Defaults visible; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiVisibility {
    pub sidebar: bool,
    pub tab_bar: bool,
}

impl Default for UiVisibility {
    fn default() -> Self {
        Self { sidebar: true, tab_bar: true }
    }
}

/// Blocking sign-in/sign-up prompt state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayState {
    pub visible: bool,
    /// At most one pending deferred action, invoked at most once on success.
    pub pending: Option<ActionId>,
}

/// Full shell state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub session: Session,
    pub ui: UiVisibility,
    pub overlay: OverlayState,
}

/// Typed mutations over [`SessionState`].
pub enum SessionAction {
    SetSession(UserRecord),
    ClearSession,
    SetUiVisibility(UiVisibility),
    ShowAuthOverlay(Option<ActionId>),
    HideAuthOverlay,
    /// Sign-in completed inside the overlay: commit the session, run the
    /// pending action exactly once, then hide the overlay.
    ResolveAuthOverlaySuccess(UserRecord),
}

struct Inner {
    state: Mutex<SessionState>,
    actions: Mutex<HashMap<ActionId, DeferredAction>>,
    next_action: AtomicU64,
    credentials: Arc<CredentialStore>,
}

/// Shared handle to the single session store. Clone freely; all clones see
/// the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    #[must_use]
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState::default()),
                actions: Mutex::new(HashMap::new()),
                next_action: AtomicU64::new(1),
                credentials,
            }),
        }
    }

    /// Hydrate the in-memory session from persisted credentials at boot.
    /// Only populates when both token and record resolve — a record without
    /// a token is stale by definition.
    pub fn hydrate(&self) {
        if self.inner.credentials.token().is_none() {
            return;
        }
        if let Some(record) = self.inner.credentials.user() {
            let mut state = self.lock_state();
            state.session = Session::Authenticated(record);
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.lock_state().clone()
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.lock_state().session.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock_state().session.is_authenticated()
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        self.inner.credentials.as_ref()
    }

    /// Register a deferred action, returning its opaque handle.
    pub fn register_action(&self, action: DeferredAction) -> ActionId {
        let id = ActionId(self.inner.next_action.fetch_add(1, Ordering::Relaxed));
        self.lock_actions().insert(id, action);
        id
    }

    /// Apply a typed mutation. Transitions are atomic; persistence happens
    /// as a side effect of `SetSession`/`ClearSession` under the same lock.
    pub fn dispatch(&self, action: SessionAction) {
        match action {
            SessionAction::SetSession(record) => {
                let mut state = self.lock_state();
                let _ = self.inner.credentials.set_user(&record);
                state.session = Session::Authenticated(record);
            }
            SessionAction::ClearSession => {
                let mut state = self.lock_state();
                self.inner.credentials.clear_all();
                state.session = Session::Anonymous;
            }
            SessionAction::SetUiVisibility(ui) => {
                self.lock_state().ui = ui;
            }
            SessionAction::ShowAuthOverlay(pending) => {
                let superseded = {
                    let mut state = self.lock_state();
                    let old = state.overlay.pending.take();
                    state.overlay = OverlayState { visible: true, pending };
                    old.filter(|old| Some(*old) != pending)
                };
                // Last caller wins: the superseded closure is dropped unrun.
                if let Some(old) = superseded {
                    self.lock_actions().remove(&old);
                }
            }
            SessionAction::HideAuthOverlay => {
                let dropped = {
                    let mut state = self.lock_state();
                    let old = state.overlay.pending.take();
                    state.overlay.visible = false;
                    old
                };
                if let Some(id) = dropped {
                    self.lock_actions().remove(&id);
                }
            }
            SessionAction::ResolveAuthOverlaySuccess(record) => {
                self.resolve_overlay_success(record);
            }
        }
    }

    /// Commit the new session, then run the pending action exactly once, then
    /// hide the overlay — in that order, and unconditionally: an action error
    /// is logged and swallowed, never rethrown. Resolving again with no
    /// pending action is a plain session refresh.
    fn resolve_overlay_success(&self, record: UserRecord) {
        let pending = {
            let mut state = self.lock_state();
            let _ = self.inner.credentials.set_user(&record);
            state.session = Session::Authenticated(record);
            state.overlay.pending.take()
        };

        // Invoked outside the state lock: the action observes the committed
        // session and may itself dispatch.
        if let Some(id) = pending {
            let action = self.lock_actions().remove(&id);
            if let Some(action) = action {
                if let Err(e) = action() {
                    tracing::warn!(error = %e, "deferred action failed after sign-in");
                }
            }
        }

        self.lock_state().overlay.visible = false;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        // A poisoned lock means a panic mid-transition; propagating the
        // poison would wedge every caller, so recover the inner state.
        self.inner.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_actions(&self) -> std::sync::MutexGuard<'_, HashMap<ActionId, DeferredAction>> {
        self.inner.actions.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
