use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::config::{AppConfig, AuthMode};
use crate::credentials::CSRF_COOKIE;
use crate::net::api::test_helpers::dummy_record;
use crate::storage::{MemoryCookies, MemoryStore};

fn harness() -> (SessionStore, Arc<CredentialStore>, Arc<MemoryCookies>) {
    let config = AppConfig::new("Test App", "https://api.example.com", AuthMode::Standard);
    let cookies = Arc::new(MemoryCookies::new());
    let credentials = Arc::new(CredentialStore::new(
        &config,
        Arc::clone(&cookies) as Arc<dyn crate::storage::CookieSource>,
        Arc::new(MemoryStore::new()),
    ));
    (SessionStore::new(Arc::clone(&credentials)), credentials, cookies)
}

fn counting_action(counter: &Arc<AtomicUsize>) -> crate::state::session::DeferredAction {
    let counter = Arc::clone(counter);
    Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
}

// =============================================================================
// Defaults and hydration
// =============================================================================

#[test]
fn default_state_is_anonymous_with_visible_chrome() {
    let (store, _, _) = harness();
    let state = store.state();
    assert_eq!(state.session, Session::Anonymous);
    assert!(state.ui.sidebar);
    assert!(state.ui.tab_bar);
    assert!(!state.overlay.visible);
    assert!(state.overlay.pending.is_none());
}

#[test]
fn hydrate_restores_session_when_token_and_record_exist() {
    let (store, credentials, cookies) = harness();
    let record = dummy_record();
    cookies.set_cookie(CSRF_COOKIE, "t");
    credentials.set_user(&record);

    store.hydrate();
    assert_eq!(store.session().user(), Some(&record));
}

#[test]
fn hydrate_ignores_record_without_token() {
    let (store, credentials, _) = harness();
    credentials.set_user(&dummy_record());

    store.hydrate();
    assert!(!store.is_authenticated());
}

// =============================================================================
// Session transitions persist as a side effect
// =============================================================================

#[test]
fn set_session_persists_the_record() {
    let (store, credentials, _) = harness();
    let record = dummy_record();

    store.dispatch(SessionAction::SetSession(record.clone()));
    assert!(store.is_authenticated());
    assert_eq!(credentials.user(), Some(record));
}

#[test]
fn clear_session_clears_credentials_too() {
    let (store, credentials, cookies) = harness();
    cookies.set_cookie(CSRF_COOKIE, "t");
    store.dispatch(SessionAction::SetSession(dummy_record()));

    store.dispatch(SessionAction::ClearSession);
    assert!(!store.is_authenticated());
    assert!(credentials.user().is_none());
    assert!(credentials.token().is_none());
}

#[test]
fn ui_visibility_is_plain_transient_state() {
    let (store, _, _) = harness();
    store.dispatch(SessionAction::SetUiVisibility(UiVisibility { sidebar: false, tab_bar: true }));
    let state = store.state();
    assert!(!state.ui.sidebar);
    assert!(state.ui.tab_bar);
}

// =============================================================================
// Overlay lifecycle
// =============================================================================

#[test]
fn show_overlay_records_the_pending_handle() {
    let (store, _, _) = harness();
    let counter = Arc::new(AtomicUsize::new(0));
    let id = store.register_action(counting_action(&counter));

    store.dispatch(SessionAction::ShowAuthOverlay(Some(id)));
    let state = store.state();
    assert!(state.overlay.visible);
    assert_eq!(state.overlay.pending, Some(id));
    assert_eq!(counter.load(Ordering::SeqCst), 0, "registering must not invoke");
}

#[test]
fn replacing_a_pending_action_drops_the_first() {
    let (store, _, _) = harness();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let first_id = store.register_action(counting_action(&first));
    store.dispatch(SessionAction::ShowAuthOverlay(Some(first_id)));
    let second_id = store.register_action(counting_action(&second));
    store.dispatch(SessionAction::ShowAuthOverlay(Some(second_id)));

    store.dispatch(SessionAction::ResolveAuthOverlaySuccess(dummy_record()));
    assert_eq!(first.load(Ordering::SeqCst), 0, "superseded action must never run");
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn hide_overlay_drops_the_pending_action_unrun() {
    let (store, _, _) = harness();
    let counter = Arc::new(AtomicUsize::new(0));
    let id = store.register_action(counting_action(&counter));
    store.dispatch(SessionAction::ShowAuthOverlay(Some(id)));

    store.dispatch(SessionAction::HideAuthOverlay);
    let state = store.state();
    assert!(!state.overlay.visible);
    assert!(state.overlay.pending.is_none());

    // A later success is a plain session refresh; the dismissed action stays dead.
    store.dispatch(SessionAction::ResolveAuthOverlaySuccess(dummy_record()));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Overlay success resolution
// =============================================================================

#[test]
fn resolve_success_commits_session_runs_action_once_then_hides() {
    let (store, credentials, _) = harness();
    let counter = Arc::new(AtomicUsize::new(0));
    let id = store.register_action(counting_action(&counter));
    store.dispatch(SessionAction::ShowAuthOverlay(Some(id)));

    let record = dummy_record();
    store.dispatch(SessionAction::ResolveAuthOverlaySuccess(record.clone()));

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(store.session().user(), Some(&record));
    assert_eq!(credentials.user(), Some(record));
    assert!(!store.state().overlay.visible);
}

#[test]
fn resolving_twice_invokes_the_action_at_most_once() {
    let (store, _, _) = harness();
    let counter = Arc::new(AtomicUsize::new(0));
    let id = store.register_action(counting_action(&counter));
    store.dispatch(SessionAction::ShowAuthOverlay(Some(id)));

    store.dispatch(SessionAction::ResolveAuthOverlaySuccess(dummy_record()));
    store.dispatch(SessionAction::ResolveAuthOverlaySuccess(dummy_record()));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_action_is_swallowed_and_overlay_still_hides() {
    let (store, _, _) = harness();
    let id = store.register_action(Box::new(|| Err("boom".into())));
    store.dispatch(SessionAction::ShowAuthOverlay(Some(id)));

    store.dispatch(SessionAction::ResolveAuthOverlaySuccess(dummy_record()));
    let state = store.state();
    assert!(state.session.is_authenticated(), "session survives a failing action");
    assert!(!state.overlay.visible);
    assert!(state.overlay.pending.is_none());
}

#[test]
fn deferred_action_observes_the_committed_session() {
    let (store, _, _) = harness();
    let observed = Arc::new(AtomicUsize::new(0));
    let observed_in_action = Arc::clone(&observed);
    let store_in_action = store.clone();
    let id = store.register_action(Box::new(move || {
        if store_in_action.is_authenticated() {
            observed_in_action.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }));
    store.dispatch(SessionAction::ShowAuthOverlay(Some(id)));

    store.dispatch(SessionAction::ResolveAuthOverlaySuccess(dummy_record()));
    assert_eq!(observed.load(Ordering::SeqCst), 1);
}
