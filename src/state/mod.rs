//! Shell state — session store, route guard, and the deferred-action gate.
//!
//! DESIGN
//! ======
//! One reducer-shaped [`session::SessionStore`] is the single source of truth
//! for identity, chrome visibility, and overlay state. The guard and gate are
//! thin collaborators holding a cloned store handle; nothing mutates session
//! state except through a dispatched [`session::SessionAction`].

pub mod gate;
pub mod guard;
pub mod session;
