//! Storage seams — key-value persistence and cookie access.
//!
//! DESIGN
//! ======
//! The shell never touches platform storage directly; it goes through the
//! [`KeyValueStore`] and [`CookieSource`] traits so a browser binding, a
//! desktop keychain, or an in-memory test double can all back the same
//! credential logic. Implementations report failure through [`StorageError`];
//! callers degrade to memory-only operation instead of propagating.

use std::collections::HashMap;
use std::sync::Mutex;

/// Errors a storage backend may report.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing store cannot be used at all (disabled, sandboxed, broken).
    #[error("storage unavailable")]
    Unavailable,

    /// The write was refused for lack of space.
    #[error("storage quota exceeded")]
    QuotaExceeded,
}

/// String-keyed persistent storage, shared across the whole app.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` means the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, overwriting any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// View of the cookie jar the app runs under.
pub trait CookieSource: Send + Sync {
    /// Return the value of the named cookie, if present and non-empty.
    fn cookie(&self, name: &str) -> Option<String>;

    /// Expire the named cookie. Platforms that cannot delete a cookie (e.g.
    /// HttpOnly ones) expire it by overwriting with an empty value.
    fn expire(&self, name: &str);
}

// =============================================================================
// IN-MEMORY IMPLEMENTATIONS
// =============================================================================

/// In-memory [`KeyValueStore`]. Backs tests and memory-only degraded mode.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.remove(key);
        Ok(())
    }
}

/// A store whose every operation fails, modelling disabled platform storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStore;

impl KeyValueStore for DisabledStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// Mutable in-memory [`CookieSource`] for tests and embedded environments.
#[derive(Debug, Default)]
pub struct MemoryCookies {
    cookies: Mutex<HashMap<String, String>>,
}

impl MemoryCookies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace a cookie value. Empty values behave as absent on read.
    pub fn set_cookie(&self, name: &str, value: &str) {
        if let Ok(mut cookies) = self.cookies.lock() {
            cookies.insert(name.to_owned(), value.to_owned());
        }
    }

    pub fn clear_cookie(&self, name: &str) {
        if let Ok(mut cookies) = self.cookies.lock() {
            cookies.remove(name);
        }
    }
}

impl CookieSource for MemoryCookies {
    fn cookie(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.lock().ok()?;
        cookies.get(name).filter(|v| !v.is_empty()).cloned()
    }

    fn expire(&self, name: &str) {
        self.clear_cookie(name);
    }
}

/// A cookie source with no cookies, for environments that block them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCookies;

impl CookieSource for NoCookies {
    fn cookie(&self, _name: &str) -> Option<String> {
        None
    }

    fn expire(&self, _name: &str) {}
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
