//! Typed application configuration.
//!
//! DESIGN
//! ======
//! The original deployment flags were loose optional booleans on an untyped
//! object; here the auth behavior is a single [`AuthMode`] sum type so guard
//! logic can match exhaustively. The app display name doubles as the source
//! of the storage key namespace (slugified, so two apps sharing a browser
//! profile cannot collide).

use std::time::Duration;

pub const DEFAULT_ME_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROTECTED_ROOT: &str = "/app";

/// How the deployment handles authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Sign-in required; protected routes confirm with the backend.
    Standard,
    /// Authentication disabled entirely; all guard logic is a pass-through.
    NoLogin,
    /// Protected UI renders optimistically; auth is requested per-action
    /// through the auth gate instead of at the route boundary.
    DeferredOverlay,
}

/// Allow-list policy for post-redirect path validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    /// Path prefixes a sanitized candidate may start with. The site root
    /// (`"/"`) matches only the root path itself, never as a prefix.
    pub allowed_prefixes: Vec<String>,
    /// Fallback path returned when a candidate is absent or rejected.
    pub default_path: String,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            allowed_prefixes: vec![DEFAULT_PROTECTED_ROOT.to_owned(), "/".to_owned()],
            default_path: DEFAULT_PROTECTED_ROOT.to_owned(),
        }
    }
}

/// Application shell configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Human-readable app name; slugified into the storage key namespace.
    pub display_name: String,
    /// Base URL of the backend collaborator, no trailing slash.
    pub api_base: String,
    pub mode: AuthMode,
    /// Bound on the authoritative `/me` validation call. `None` leaves the
    /// guard in `Checking` for as long as the transport allows.
    pub me_timeout: Option<Duration>,
    pub redirect: RedirectPolicy,
}

impl AppConfig {
    #[must_use]
    pub fn new(display_name: &str, api_base: &str, mode: AuthMode) -> Self {
        Self {
            display_name: display_name.to_owned(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            mode,
            me_timeout: Some(Duration::from_secs(DEFAULT_ME_TIMEOUT_SECS)),
            redirect: RedirectPolicy::default(),
        }
    }

    /// Build config from environment variables.
    ///
    /// Required: `APP_NAME`, `APP_API_BASE`.
    ///
    /// Optional:
    /// - `APP_NO_LOGIN`: disable authentication entirely
    /// - `APP_DEFERRED_AUTH`: gate per-action instead of per-route
    /// - `APP_ME_TIMEOUT_SECS`: `0` disables the validation timeout
    ///
    /// Returns `None` if a required variable is missing.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let display_name = std::env::var("APP_NAME").ok()?;
        let api_base = std::env::var("APP_API_BASE").ok()?;

        let mode = if env_bool("APP_NO_LOGIN").unwrap_or(false) {
            AuthMode::NoLogin
        } else if env_bool("APP_DEFERRED_AUTH").unwrap_or(false) {
            AuthMode::DeferredOverlay
        } else {
            AuthMode::Standard
        };

        let mut config = Self::new(&display_name, &api_base, mode);
        if let Ok(raw) = std::env::var("APP_ME_TIMEOUT_SECS") {
            config.me_timeout = match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => config.me_timeout,
            };
        }
        Some(config)
    }

    /// Storage key namespace derived from the display name: lowercased, runs
    /// of non-alphanumeric characters collapsed to a single underscore.
    #[must_use]
    pub fn namespace(&self) -> String {
        slugify(&self.display_name)
    }
}

#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut gap = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('_');
            }
            gap = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            gap = true;
        }
    }
    slug
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
