//! Wire types shared by the session API and the state layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by session API operations.
///
/// Display strings double as the user-facing surface: a rejection and a
/// transport failure deliberately leak no internal detail.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend refused the credentials or the session (non-2xx).
    #[error("Invalid Credentials")]
    Rejected,

    /// The request never produced a usable response.
    #[error("Server Error")]
    Transport(String),

    /// Client-side precondition; no request was sent.
    #[error("password must be between {min} and {max} characters", min = PASSWORD_MIN_LEN, max = PASSWORD_MAX_LEN)]
    PasswordLength,

    /// A 2xx response whose body did not match the expected shape.
    #[error("Server Error")]
    Malformed(String),

    /// The payment provider endpoint answered without a redirect URL.
    #[error("no redirect url in provider response")]
    MissingRedirectUrl,

    /// The underlying HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
}

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 72;

// =============================================================================
// SESSION RECORD
// =============================================================================

/// Subscription details attached to the session record. Opaque to the core;
/// carried through for the UI and the quota display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub plan: String,
    pub active: bool,
}

/// The authenticated identity as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub subscription: Option<SubscriptionInfo>,
}

// =============================================================================
// USAGE / QUOTA
// =============================================================================

/// Quota accounting operation sent to `/usage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageOp {
    Check,
    Track,
}

/// Quota snapshot returned by `/usage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub remaining: i64,
    pub total: i64,
    pub is_subscriber: bool,
}

impl UsageSnapshot {
    /// Zeroed non-subscriber snapshot, returned when quota state cannot be
    /// determined. Fails closed: no quota rather than unlimited quota.
    #[must_use]
    pub fn exhausted() -> Self {
        Self { remaining: 0, total: 0, is_subscriber: false }
    }
}

/// Payment provider redirect response from `/checkout` and `/portal`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRedirect {
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
