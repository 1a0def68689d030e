//! Binds the heartbeat to auth state and session expiry to navigation.
//!
//! SYSTEM CONTEXT
//! ==============
//! Installed once by the root composition. Every store transition is
//! re-evaluated: signed in means the heartbeat runs, signed out means it
//! stops. On expiry the user is cleared *before* redirecting to `/login` so
//! nothing keyed on the session refires against a dead session mid-redirect.

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_test;

use std::cell::Cell;
use std::rc::Rc;

use super::heartbeat::{HeartbeatCallbacks, SessionHeartbeat};
use crate::state::auth::{AuthSnapshot, AuthStore, ListenerId};

/// Login entry point used for expiry redirects.
pub const LOGIN_PATH: &str = "/login";

/// Live binding between store, heartbeat, and navigation. Dropping it (or
/// calling `teardown`) detaches from the store and stops the heartbeat.
pub struct SessionLifecycle {
    store: AuthStore,
    heartbeat: SessionHeartbeat,
    listener: Cell<Option<ListenerId>>,
}

impl SessionLifecycle {
    pub fn install<N>(store: AuthStore, heartbeat: SessionHeartbeat, navigate: N) -> Self
    where
        N: Fn(&str) + 'static,
    {
        let on_expired = {
            let store = store.clone();
            move || {
                store.clear_user();
                navigate(LOGIN_PATH);
            }
        };
        heartbeat.configure(HeartbeatCallbacks {
            on_session_expired: Some(Rc::new(on_expired)),
            on_error: Some(Rc::new(|err| log::error!("[session] heartbeat error: {err}"))),
            ..HeartbeatCallbacks::default()
        });

        reconcile(&heartbeat, &store.snapshot());
        let listener = {
            let heartbeat = heartbeat.clone();
            store.subscribe(move |snapshot| reconcile(&heartbeat, snapshot))
        };

        Self { store, heartbeat, listener: Cell::new(Some(listener)) }
    }

    /// Detach from the store and stop the heartbeat. Safe to call twice.
    pub fn teardown(&self) {
        if let Some(id) = self.listener.take() {
            self.store.unsubscribe(id);
            log::debug!("[session] lifecycle torn down");
        }
        self.heartbeat.stop();
    }
}

impl Drop for SessionLifecycle {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn reconcile(heartbeat: &SessionHeartbeat, snapshot: &AuthSnapshot) {
    if snapshot.is_authenticated() {
        heartbeat.start();
    } else {
        heartbeat.stop();
    }
}
