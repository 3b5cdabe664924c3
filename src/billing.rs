//! Payment round-trip orchestration.
//!
//! Leaving for the provider's checkout or portal stores the current path;
//! coming back consumes it through the redirect validator and refreshes the
//! session (a completed checkout changes subscription state, so the cached
//! identity is re-fetched). Navigation itself is the caller's job.

use std::sync::Arc;

use crate::config::RedirectPolicy;
use crate::credentials::{CredentialStore, ReturnSlot};
use crate::net::{SessionApi, UsageOp, UsageSnapshot};
use crate::redirect;
use crate::state::session::{SessionAction, SessionStore};

#[derive(Clone)]
pub struct Billing {
    api: Arc<dyn SessionApi>,
    credentials: Arc<CredentialStore>,
    store: SessionStore,
    policy: RedirectPolicy,
}

impl Billing {
    #[must_use]
    pub fn new(
        api: Arc<dyn SessionApi>,
        credentials: Arc<CredentialStore>,
        store: SessionStore,
        policy: RedirectPolicy,
    ) -> Self {
        Self { api, credentials, store, policy }
    }

    /// Start a checkout: remember `current_path` and return the provider URL
    /// to navigate to. `None` (logged) when no URL could be obtained — the
    /// caller must not navigate.
    pub async fn begin_checkout(&self, current_path: &str) -> Option<String> {
        self.begin(ReturnSlot::Checkout, current_path).await
    }

    /// Start a manage-subscription flow; same contract as `begin_checkout`.
    pub async fn begin_manage(&self, current_path: &str) -> Option<String> {
        self.begin(ReturnSlot::Manage, current_path).await
    }

    async fn begin(&self, slot: ReturnSlot, current_path: &str) -> Option<String> {
        let _ = self.credentials.remember_return_path(slot, current_path);
        let result = match slot {
            ReturnSlot::Checkout => self.api.checkout_url().await,
            ReturnSlot::Manage => self.api.portal_url().await,
        };
        match result {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, ?slot, "provider redirect unavailable");
                None
            }
        }
    }

    /// Handle the return leg: consume the stored path, validate it, and
    /// refresh the session from `/me`. Always yields a safe path; a failed
    /// refresh leaves the session untouched.
    pub async fn resume(&self, slot: ReturnSlot) -> String {
        let stored = self.credentials.take_return_path(slot);
        let path = redirect::sanitize(stored.as_deref(), &self.policy);

        match self.api.me().await {
            Ok(record) => self.store.dispatch(SessionAction::SetSession(record)),
            Err(e) => tracing::warn!(error = %e, "session refresh after provider return failed"),
        }

        path
    }

    /// Quota accounting passthrough; never fails (see [`SessionApi::usage`]).
    pub async fn usage(&self, op: UsageOp) -> UsageSnapshot {
        self.api.usage(op).await
    }
}

#[cfg(test)]
#[path = "billing_test.rs"]
mod tests;
