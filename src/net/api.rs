//! Session API — the HTTP seam to the backend collaborator.
//!
//! DESIGN
//! ======
//! State machinery depends on the [`SessionApi`] trait, not on reqwest, so
//! guard and flow tests run against mock backends. [`HttpSessionApi`] is the
//! real implementation: cookie jar enabled (the backend's session cookie
//! rides along automatically) and the CSRF token echoed in an `X-CSRF-Token`
//! header on every state-changing call when one resolves.
//!
//! ERROR HANDLING
//! ==============
//! Rejections and transport failures map to [`ApiError`] variants whose
//! display strings are the entire user-facing surface; response bodies and
//! status detail stay in logs.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::net::types::{
    ApiError, PASSWORD_MAX_LEN, PASSWORD_MIN_LEN, ProviderRedirect, UsageOp, UsageSnapshot, UserRecord,
};

/// Header carrying the CSRF double-submit token.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Whether a `/usage` response body carries trustworthy quota data. Success
/// always does; so does a 429 on `track`, where the quota-exhausted rejection
/// still reports the current counts.
fn usage_body_usable(op: UsageOp, status: reqwest::StatusCode) -> bool {
    status.is_success() || (op == UsageOp::Track && status == reqwest::StatusCode::TOO_MANY_REQUESTS)
}

/// Backend operations the session core depends on.
#[async_trait::async_trait]
pub trait SessionApi: Send + Sync {
    /// `POST /signin` — authenticate with email and password.
    async fn signin(&self, email: &str, password: &str) -> Result<UserRecord, ApiError>;

    /// `POST /signup` — register. Password length is validated client-side
    /// before any request is sent.
    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<UserRecord, ApiError>;

    /// `GET /me` — authoritative session check.
    async fn me(&self) -> Result<UserRecord, ApiError>;

    /// `POST /signout` — server-side teardown. Failures are logged only; the
    /// caller always proceeds to clear local state.
    async fn signout(&self);

    /// `POST /checkout` — obtain the payment provider's checkout URL.
    async fn checkout_url(&self) -> Result<String, ApiError>;

    /// `POST /portal` — obtain the payment provider's portal URL.
    async fn portal_url(&self) -> Result<String, ApiError>;

    /// `POST /usage` — quota accounting. Never fails: undeterminable quota
    /// comes back as the zeroed non-subscriber snapshot.
    async fn usage(&self, op: UsageOp) -> UsageSnapshot;
}

/// reqwest-backed [`SessionApi`].
pub struct HttpSessionApi {
    client: reqwest::Client,
    base: String,
    credentials: Arc<CredentialStore>,
}

impl HttpSessionApi {
    /// Build the HTTP client with its own cookie store.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the underlying client cannot be
    /// constructed.
    pub fn new(config: &AppConfig, credentials: Arc<CredentialStore>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { client, base: config.api_base.clone(), credentials })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// POST builder with the CSRF header attached when a token resolves.
    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(self.url(path));
        if let Some(token) = self.credentials.token() {
            req = req.header(CSRF_HEADER, token);
        }
        req
    }

    /// Mirror a token echoed in the response into the fallback store, so
    /// token resolution keeps working where cookies are blocked.
    fn capture_csrf(&self, resp: &reqwest::Response) {
        if let Some(token) = resp.headers().get(CSRF_HEADER).and_then(|v| v.to_str().ok()) {
            if !token.is_empty() {
                let _ = self.credentials.set_token(token);
            }
        }
    }

    async fn auth_request(&self, path: &str, body: serde_json::Value) -> Result<UserRecord, ApiError> {
        let resp = self
            .post(path)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            tracing::debug!(path, status = resp.status().as_u16(), "auth request rejected");
            return Err(ApiError::Rejected);
        }

        self.capture_csrf(&resp);
        resp.json::<UserRecord>()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))
    }

    async fn provider_url(&self, path: &str) -> Result<String, ApiError> {
        let resp = self
            .post(path)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ApiError::Transport(format!("{path} returned {}", resp.status())));
        }

        let redirect = resp
            .json::<ProviderRedirect>()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        redirect.url.filter(|u| !u.is_empty()).ok_or(ApiError::MissingRedirectUrl)
    }
}

#[async_trait::async_trait]
impl SessionApi for HttpSessionApi {
    async fn signin(&self, email: &str, password: &str) -> Result<UserRecord, ApiError> {
        self.auth_request("/signin", serde_json::json!({ "email": email, "password": password }))
            .await
    }

    async fn signup(&self, email: &str, password: &str, name: &str) -> Result<UserRecord, ApiError> {
        if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&password.len()) {
            return Err(ApiError::PasswordLength);
        }
        self.auth_request(
            "/signup",
            serde_json::json!({ "email": email, "password": password, "name": name }),
        )
        .await
    }

    async fn me(&self) -> Result<UserRecord, ApiError> {
        let resp = self
            .client
            .get(self.url("/me"))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ApiError::Rejected);
        }

        resp.json::<UserRecord>()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))
    }

    async fn signout(&self) {
        match self.post("/signout").send().await {
            Ok(resp) if !resp.status().is_success() => {
                tracing::warn!(status = resp.status().as_u16(), "signout rejected by backend");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "signout request failed"),
        }
    }

    async fn checkout_url(&self) -> Result<String, ApiError> {
        self.provider_url("/checkout").await
    }

    async fn portal_url(&self) -> Result<String, ApiError> {
        self.provider_url("/portal").await
    }

    async fn usage(&self, op: UsageOp) -> UsageSnapshot {
        let resp = match self.post("/usage").json(&serde_json::json!({ "operation": op })).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "usage request failed");
                return UsageSnapshot::exhausted();
            }
        };

        let status = resp.status();
        if !usage_body_usable(op, status) {
            tracing::warn!(status = status.as_u16(), "usage request rejected");
            return UsageSnapshot::exhausted();
        }

        match resp.json::<UsageSnapshot>().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "usage response unparseable");
                UsageSnapshot::exhausted()
            }
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
