//! Credential persistence — CSRF token resolution and the session record.
//!
//! DESIGN
//! ======
//! The CSRF token follows the double-submit pattern: the backend sets a
//! `csrf_token` cookie, and the store keeps a namespaced fallback copy for
//! environments where the cookie is unreadable. The cookie always wins when
//! both exist. All persisted keys share a slug prefix derived from the app
//! display name so apps sharing a profile cannot clobber each other.
//!
//! TRADE-OFFS
//! ==========
//! Storage is probed once (write-then-delete a sentinel) and the verdict is
//! cached for the store's lifetime. When the probe fails, writes become
//! warn-logged no-ops and reads return `None`: the session simply will not
//! survive a reload. No storage failure ever reaches the caller as an error.

use std::sync::{Arc, OnceLock};

use crate::config::{AppConfig, AuthMode};
use crate::net::types::UserRecord;
use crate::storage::{CookieSource, KeyValueStore};

/// Cookie holding the authoritative CSRF token, set by the backend.
pub const CSRF_COOKIE: &str = "csrf_token";

const USER_KEY: &str = "user";
const CSRF_KEY: &str = "csrf";
const PROBE_KEY: &str = "probe";

/// Whether a write actually reached persistent storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Persisted,
    /// Storage is unusable; the value lives only in memory upstream.
    Ephemeral,
}

/// Which payment round-trip a stored return path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnSlot {
    Checkout,
    Manage,
}

impl ReturnSlot {
    fn key_suffix(self) -> &'static str {
        match self {
            Self::Checkout => "beforeCheckoutURL",
            Self::Manage => "beforeManageURL",
        }
    }
}

/// Reads and writes the CSRF token and namespaced persisted session data.
pub struct CredentialStore {
    cookies: Arc<dyn CookieSource>,
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    no_login: bool,
    usable: OnceLock<bool>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(config: &AppConfig, cookies: Arc<dyn CookieSource>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            cookies,
            store,
            namespace: config.namespace(),
            no_login: config.mode == AuthMode::NoLogin,
            usable: OnceLock::new(),
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.namespace)
    }

    /// Capability probe: write-then-delete a sentinel key. The verdict is
    /// cached for the lifetime of this store.
    fn storage_usable(&self) -> bool {
        *self.usable.get_or_init(|| {
            let key = self.key(PROBE_KEY);
            let ok = self.store.set(&key, "1").is_ok()
                && matches!(self.store.get(&key), Ok(Some(_)))
                && self.store.remove(&key).is_ok();
            if !ok {
                tracing::warn!("persistent storage unusable; session will not survive a reload");
            }
            ok
        })
    }

    fn read(&self, suffix: &str) -> Option<String> {
        if !self.storage_usable() {
            return None;
        }
        match self.store.get(&self.key(suffix)) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, key = suffix, "storage read failed");
                None
            }
        }
    }

    fn write(&self, suffix: &str, value: &str) -> Persistence {
        if !self.storage_usable() {
            return Persistence::Ephemeral;
        }
        match self.store.set(&self.key(suffix), value) {
            Ok(()) => Persistence::Persisted,
            Err(e) => {
                tracing::warn!(error = %e, key = suffix, "storage write failed; continuing unpersisted");
                Persistence::Ephemeral
            }
        }
    }

    fn delete(&self, suffix: &str) {
        if !self.storage_usable() {
            return;
        }
        if let Err(e) = self.store.remove(&self.key(suffix)) {
            tracing::warn!(error = %e, key = suffix, "storage delete failed");
        }
    }

    // =========================================================================
    // CSRF TOKEN
    // =========================================================================

    /// Resolve the CSRF token: cookie first, then the namespaced fallback.
    /// Never fails; `None` means no token exists anywhere.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        if let Some(value) = self.cookies.cookie(CSRF_COOKIE) {
            return Some(value);
        }
        self.read(CSRF_KEY).filter(|v| !v.is_empty())
    }

    /// Mirror a token into the fallback key. The cookie itself is
    /// backend-owned and never written here.
    pub fn set_token(&self, token: &str) -> Persistence {
        self.write(CSRF_KEY, token)
    }

    pub fn clear_token(&self) {
        self.cookies.expire(CSRF_COOKIE);
        self.delete(CSRF_KEY);
    }

    // =========================================================================
    // SESSION RECORD
    // =========================================================================

    /// Read the persisted session record, if one exists and parses.
    #[must_use]
    pub fn user(&self) -> Option<UserRecord> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "persisted session record is corrupt; ignoring");
                None
            }
        }
    }

    pub fn set_user(&self, record: &UserRecord) -> Persistence {
        match serde_json::to_string(record) {
            Ok(json) => self.write(USER_KEY, &json),
            Err(e) => {
                tracing::warn!(error = %e, "session record serialization failed");
                Persistence::Ephemeral
            }
        }
    }

    pub fn clear_user(&self) {
        self.delete(USER_KEY);
    }

    /// Clear token and session record together. Used when an authoritative
    /// check proves the cached credentials stale.
    pub fn clear_all(&self) {
        self.clear_token();
        self.clear_user();
    }

    /// Fast, non-authoritative auth check: true in no-login mode, or when
    /// both a CSRF token and a persisted session record are present. Decides
    /// optimistic UI state only; never a substitute for backend validation.
    #[must_use]
    pub fn is_locally_authenticated(&self) -> bool {
        self.no_login || (self.token().is_some() && self.user().is_some())
    }

    // =========================================================================
    // RETURN PATHS
    // =========================================================================

    /// Remember where to return after an external provider round-trip.
    pub fn remember_return_path(&self, slot: ReturnSlot, path: &str) -> Persistence {
        self.write(slot.key_suffix(), path)
    }

    /// Consume the stored return path for `slot`, clearing it. The caller is
    /// responsible for validating the value before navigating.
    #[must_use]
    pub fn take_return_path(&self, slot: ReturnSlot) -> Option<String> {
        let path = self.read(slot.key_suffix());
        if path.is_some() {
            self.delete(slot.key_suffix());
        }
        path
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
