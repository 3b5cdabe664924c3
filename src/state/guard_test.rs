use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::credentials::CSRF_COOKIE;
use crate::net::api::test_helpers::{MockApi, MockOutcome, dummy_record, init_tracing};
use crate::storage::{MemoryCookies, MemoryStore};

struct Harness {
    guard: Arc<RouteGuard>,
    api: Arc<MockApi>,
    credentials: Arc<CredentialStore>,
    cookies: Arc<MemoryCookies>,
    store: SessionStore,
}

fn harness(mode: AuthMode) -> Harness {
    init_tracing();
    let mut config = AppConfig::new("Test App", "https://api.example.com", mode);
    config.me_timeout = Some(Duration::from_secs(10));

    let cookies = Arc::new(MemoryCookies::new());
    let credentials = Arc::new(CredentialStore::new(
        &config,
        Arc::clone(&cookies) as Arc<dyn crate::storage::CookieSource>,
        Arc::new(MemoryStore::new()),
    ));
    let api = Arc::new(MockApi::new());
    let store = SessionStore::new(Arc::clone(&credentials));
    let guard = Arc::new(RouteGuard::new(
        &config,
        Arc::clone(&credentials),
        Arc::clone(&api) as Arc<dyn crate::net::SessionApi>,
        store.clone(),
    ));
    Harness { guard, api, credentials, cookies, store }
}

fn seed_local_credentials(h: &Harness) {
    h.cookies.set_cookie(CSRF_COOKIE, "token");
    h.credentials.set_user(&dummy_record());
}

// =============================================================================
// Pure transition step
// =============================================================================

#[test]
fn deferred_overlay_allows_regardless_of_credentials() {
    assert_eq!(decide_local(AuthMode::DeferredOverlay, false), LocalDecision::Allow);
    assert_eq!(decide_local(AuthMode::DeferredOverlay, true), LocalDecision::Allow);
}

#[test]
fn missing_local_credentials_deny_without_backend() {
    assert_eq!(decide_local(AuthMode::Standard, false), LocalDecision::Deny);
}

#[test]
fn no_login_allows_without_backend() {
    assert_eq!(decide_local(AuthMode::NoLogin, true), LocalDecision::Allow);
}

#[test]
fn standard_mode_with_credentials_confirms() {
    assert_eq!(decide_local(AuthMode::Standard, true), LocalDecision::Confirm);
}

// =============================================================================
// Local resolutions — no network traffic
// =============================================================================

#[tokio::test]
async fn no_login_mount_is_valid_immediately_without_network() {
    let h = harness(AuthMode::NoLogin);
    assert_eq!(h.guard.state(), GuardState::Checking);

    assert_eq!(h.guard.validate().await, GuardState::Valid);
    assert_eq!(h.guard.state(), GuardState::Valid);
    assert_eq!(h.api.me_calls(), 0);
}

#[tokio::test]
async fn deferred_overlay_mount_is_valid_without_network() {
    let h = harness(AuthMode::DeferredOverlay);
    assert_eq!(h.guard.validate().await, GuardState::Valid);
    assert_eq!(h.api.me_calls(), 0);
}

#[tokio::test]
async fn missing_credentials_invalidate_without_network() {
    let h = harness(AuthMode::Standard);
    assert_eq!(h.guard.validate().await, GuardState::Invalid);
    assert_eq!(h.api.me_calls(), 0);
}

// =============================================================================
// Authoritative confirmation
// =============================================================================

#[tokio::test]
async fn backend_confirmation_validates_and_refreshes_session() {
    let h = harness(AuthMode::Standard);
    seed_local_credentials(&h);
    let record = dummy_record();
    h.api.set_me(MockOutcome::Succeed(record.clone()));

    assert_eq!(h.guard.validate().await, GuardState::Valid);
    assert_eq!(h.api.me_calls(), 1);
    assert_eq!(h.store.session().user(), Some(&record));
    // No credential clearing on success.
    assert!(h.credentials.token().is_some());
    assert!(h.credentials.user().is_some());
}

#[tokio::test]
async fn backend_rejection_invalidates_and_clears_credentials() {
    let h = harness(AuthMode::Standard);
    seed_local_credentials(&h);
    h.api.set_me(MockOutcome::Reject);

    assert_eq!(h.guard.validate().await, GuardState::Invalid);
    assert!(h.credentials.token().is_none());
    assert!(h.credentials.user().is_none());
    assert!(!h.store.is_authenticated());
}

#[tokio::test]
async fn transport_failure_fails_closed_and_clears_credentials() {
    let h = harness(AuthMode::Standard);
    seed_local_credentials(&h);
    h.api.set_me(MockOutcome::Fail);

    assert_eq!(h.guard.validate().await, GuardState::Invalid);
    assert!(h.credentials.token().is_none());
    assert!(h.credentials.user().is_none());
}

#[tokio::test(start_paused = true)]
async fn hung_backend_times_out_to_invalid_without_clearing() {
    let h = harness(AuthMode::Standard);
    seed_local_credentials(&h);
    h.api.set_me(MockOutcome::Hang);

    assert_eq!(h.guard.validate().await, GuardState::Invalid);
    // A hung transport proves nothing about the cached credentials.
    assert!(h.credentials.token().is_some());
    assert!(h.credentials.user().is_some());
}

// =============================================================================
// Single flight and cancellation
// =============================================================================

#[tokio::test]
async fn repeat_validation_reuses_the_resolved_state() {
    let h = harness(AuthMode::Standard);
    seed_local_credentials(&h);
    h.api.set_me(MockOutcome::Succeed(dummy_record()));

    assert_eq!(h.guard.validate().await, GuardState::Valid);
    assert_eq!(h.guard.validate().await, GuardState::Valid);
    assert_eq!(h.api.me_calls(), 1, "one authoritative request per mount");
}

#[tokio::test(start_paused = true)]
async fn cancelled_mount_discards_the_in_flight_result() {
    let h = harness(AuthMode::Standard);
    seed_local_credentials(&h);
    h.api.set_me(MockOutcome::Succeed(dummy_record()));
    h.api.set_me_delay(Duration::from_secs(1));

    let guard = Arc::clone(&h.guard);
    let task = tokio::spawn(async move { guard.validate().await });
    tokio::task::yield_now().await;

    h.guard.cancel();
    let resolved = task.await.expect("validation task completes");

    assert_eq!(resolved, GuardState::Checking, "result is discarded, not committed");
    assert_eq!(h.guard.state(), GuardState::Checking);
    assert!(!h.store.is_authenticated(), "no state update after unmount");
}
