//! Route guard — per-mount validation of access to a protected subtree.
//!
//! DESIGN
//! ======
//! An explicit three-state machine replaces the original nested conditionals:
//! `Checking` (initial) resolves once to `Valid` or `Invalid`, terminal for
//! the mount. The local step is a pure function over the auth mode and the
//! fast credential check; only the `Confirm` outcome costs a backend call.
//! Rendering maps `Checking` to a neutral loading affordance, `Valid` to the
//! protected subtree, and `Invalid` to a history-replacing redirect to the
//! sign-in entry point — that mapping is the UI layer's job.
//!
//! TRADE-OFFS
//! ==========
//! A transient network failure is indistinguishable from an invalid session,
//! and both fail closed to `Invalid` with no retry. The authoritative call is
//! bounded by the configured timeout; a timeout also fails closed, but does
//! not clear credentials — only an actual rejection proves them stale.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{AppConfig, AuthMode};
use crate::credentials::CredentialStore;
use crate::net::SessionApi;
use crate::state::session::{SessionAction, SessionStore};

/// Guard state for one protected-subtree mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Valid,
    Invalid,
}

/// Outcome of the local, non-authoritative step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalDecision {
    /// Access granted without a backend round-trip.
    Allow,
    /// Fail closed immediately; no backend round-trip.
    Deny,
    /// Plausible local credentials; confirm with the backend.
    Confirm,
}

/// Pure transition step, evaluated in order: deferred-overlay deployments
/// pass (protection happens at the gate), missing local credentials deny,
/// no-login passes, and standard mode asks the backend.
#[must_use]
pub fn decide_local(mode: AuthMode, locally_authenticated: bool) -> LocalDecision {
    match mode {
        AuthMode::DeferredOverlay => LocalDecision::Allow,
        _ if !locally_authenticated => LocalDecision::Deny,
        AuthMode::NoLogin => LocalDecision::Allow,
        AuthMode::Standard => LocalDecision::Confirm,
    }
}

/// One guard instance per protected-subtree mount. Remounting means a fresh
/// instance back in `Checking`.
pub struct RouteGuard {
    mode: AuthMode,
    me_timeout: Option<Duration>,
    credentials: Arc<CredentialStore>,
    api: Arc<dyn SessionApi>,
    store: SessionStore,
    state: Mutex<GuardState>,
    started: AtomicBool,
    cancelled: AtomicBool,
}

impl RouteGuard {
    #[must_use]
    pub fn new(
        config: &AppConfig,
        credentials: Arc<CredentialStore>,
        api: Arc<dyn SessionApi>,
        store: SessionStore,
    ) -> Self {
        Self {
            mode: config.mode,
            me_timeout: config.me_timeout,
            credentials,
            api,
            store,
            state: Mutex::new(GuardState::Checking),
            started: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn state(&self) -> GuardState {
        *self.lock_state()
    }

    /// Mark the owning subtree unmounted. A validation still in flight will
    /// discard its result instead of committing it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Run the validation for this mount and return the resolved state.
    ///
    /// At most one validation runs per mount: concurrent or repeat calls
    /// return the current state without issuing another request.
    pub async fn validate(&self) -> GuardState {
        if self.started.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        let next = match decide_local(self.mode, self.credentials.is_locally_authenticated()) {
            LocalDecision::Allow => GuardState::Valid,
            LocalDecision::Deny => GuardState::Invalid,
            LocalDecision::Confirm => self.confirm_with_backend().await,
        };
        self.commit(next)
    }

    /// One authoritative `/me` round-trip. Success refreshes the session
    /// store; rejection or transport failure clears the cached credentials —
    /// a rejected session proves them stale.
    async fn confirm_with_backend(&self) -> GuardState {
        let outcome = match self.me_timeout {
            Some(bound) => match tokio::time::timeout(bound, self.api.me()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(timeout_secs = bound.as_secs(), "session validation timed out");
                    return GuardState::Invalid;
                }
            },
            None => self.api.me().await,
        };

        if self.cancelled.load(Ordering::SeqCst) {
            // Unmounted while in flight; the result must not be acted upon.
            return self.state();
        }

        match outcome {
            Ok(record) => {
                self.store.dispatch(SessionAction::SetSession(record));
                GuardState::Valid
            }
            Err(e) => {
                tracing::warn!(error = %e, "session validation rejected; clearing credentials");
                // ClearSession clears the credential store as its side effect.
                self.store.dispatch(SessionAction::ClearSession);
                GuardState::Invalid
            }
        }
    }

    fn commit(&self, next: GuardState) -> GuardState {
        if self.cancelled.load(Ordering::SeqCst) {
            return self.state();
        }
        let mut state = self.lock_state();
        *state = next;
        next
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
