//! # appshell
//!
//! Headless session & authentication core for a client application shell:
//! the process-wide session store, the route guard that reconciles optimistic
//! local auth state with authoritative backend validation, the deferred-action
//! auth gate, credential persistence with CSRF double-submit handling, and the
//! redirect-safety validator used after payment-provider round-trips.
//!
//! DESIGN
//! ======
//! Presentation and the backend live behind seams: UI layers render the typed
//! state exposed by [`state::session::SessionStore`] and
//! [`state::guard::RouteGuard`], and the backend is reached through the
//! [`net::SessionApi`] trait so tests can substitute a mock. Everything that
//! decides access fails closed: ambiguity, storage failure, and transport
//! errors all resolve to the unauthenticated/invalid side.

pub mod auth_flow;
pub mod billing;
pub mod config;
pub mod credentials;
pub mod net;
pub mod redirect;
pub mod state;
pub mod storage;
