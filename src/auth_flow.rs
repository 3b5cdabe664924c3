//! Sign-in / sign-up / sign-out orchestration over the session store.
//!
//! The overlay (or a full-page form) drives these; they own the ordering
//! guarantees: a successful sign-in resolves the overlay — committing the
//! session before any deferred action runs — and sign-out always clears
//! local state, whether or not the backend teardown succeeded.

use std::sync::Arc;

use crate::net::types::ApiError;
use crate::net::SessionApi;
use crate::state::session::{SessionAction, SessionStore};

#[derive(Clone)]
pub struct AuthFlow {
    api: Arc<dyn SessionApi>,
    store: SessionStore,
}

impl AuthFlow {
    #[must_use]
    pub fn new(api: Arc<dyn SessionApi>, store: SessionStore) -> Self {
        Self { api, store }
    }

    /// Authenticate and resolve the auth overlay on success.
    ///
    /// # Errors
    ///
    /// [`ApiError::Rejected`] on refused credentials, [`ApiError::Transport`]
    /// when the backend is unreachable. The overlay stays up either way.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let record = self.api.signin(email, password).await?;
        self.store.dispatch(SessionAction::ResolveAuthOverlaySuccess(record));
        Ok(())
    }

    /// Register and resolve the auth overlay on success.
    ///
    /// # Errors
    ///
    /// As [`AuthFlow::sign_in`], plus [`ApiError::PasswordLength`] when the
    /// password fails the client-side length check (no request is sent).
    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<(), ApiError> {
        let record = self.api.signup(email, password, name).await?;
        self.store.dispatch(SessionAction::ResolveAuthOverlaySuccess(record));
        Ok(())
    }

    /// Tear down the server session, then clear local state. Backend errors
    /// are logged inside the API layer; local clearing is unconditional.
    pub async fn sign_out(&self) {
        self.api.signout().await;
        self.store.dispatch(SessionAction::ClearSession);
    }
}

#[cfg(test)]
#[path = "auth_flow_test.rs"]
mod tests;
