//! Auth-session state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! `AuthStore` is the single source of truth for "who is logged in". Auth
//! handlers write it; the session lifecycle, route guards, and the Leptos
//! bridge observe it. The snapshot is persisted so a reload starts from the
//! last known state before `/auth/me` has answered.
//!
//! DESIGN
//! ======
//! `AuthSnapshot` can only be built from an `Option<User>`, so the
//! `is_authenticated == user.is_some()` pairing holds for every value the
//! store can hold, including ones read back from storage.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::events::{SubscriptionId, UnauthorizedSignal};
use crate::net::types::User;
use crate::util::storage::{KeyValueStorage, load_json, save_json};

/// Storage key holding the persisted snapshot.
pub const STORAGE_KEY: &str = "auth-storage";

const STORAGE_VERSION: u32 = 0;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    user: Option<User>,
    is_authenticated: bool,
}

impl AuthSnapshot {
    pub fn from_user(user: Option<User>) -> Self {
        let is_authenticated = user.is_some();
        Self { user, is_authenticated }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedAuth {
    state: AuthSnapshot,
    #[serde(default)]
    version: u32,
}

/// Identifier returned by `AuthStore::subscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&AuthSnapshot)>;

struct StoreInner {
    snapshot: RefCell<AuthSnapshot>,
    storage: Rc<dyn KeyValueStorage>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_id: Cell<u64>,
}

/// Observable, persisted auth snapshot. Clones share state.
#[derive(Clone)]
pub struct AuthStore {
    inner: Rc<StoreInner>,
}

impl AuthStore {
    /// Build the store, seeding state from `storage`.
    pub fn load(storage: Rc<dyn KeyValueStorage>) -> Self {
        let snapshot = load_json::<PersistedAuth>(storage.as_ref(), STORAGE_KEY)
            .map(|persisted| AuthSnapshot::from_user(persisted.state.user))
            .unwrap_or_default();
        log::debug!("[auth] restored snapshot (authenticated: {})", snapshot.is_authenticated);
        Self {
            inner: Rc::new(StoreInner {
                snapshot: RefCell::new(snapshot),
                storage,
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.snapshot.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.snapshot.borrow().is_authenticated
    }

    /// Replace the user; the authenticated flag follows. Listeners run only
    /// when the snapshot actually changed.
    pub fn set_user(&self, user: Option<User>) {
        let next = AuthSnapshot::from_user(user);
        {
            let mut current = self.inner.snapshot.borrow_mut();
            if *current == next {
                return;
            }
            *current = next.clone();
        }
        save_json(
            self.inner.storage.as_ref(),
            STORAGE_KEY,
            &PersistedAuth { state: next.clone(), version: STORAGE_VERSION },
        );
        match next.user() {
            Some(user) => log::info!("[auth] signed in as {}", user.email),
            None => log::info!("[auth] signed out"),
        }
        self.notify(&next);
    }

    pub fn clear_user(&self) {
        self.set_user(None);
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AuthSnapshot) + 'static,
    {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    /// Clear the user whenever `signal` fires. This is the only place the
    /// unauthorized signal turns into a state change.
    pub fn bind_unauthorized(&self, signal: &UnauthorizedSignal) -> SubscriptionId {
        let weak: Weak<StoreInner> = Rc::downgrade(&self.inner);
        signal.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                AuthStore { inner }.clear_user();
            }
        })
    }

    fn notify(&self, snapshot: &AuthSnapshot) {
        let listeners: Vec<Listener> = self.inner.listeners.borrow().iter().map(|(_, l)| Rc::clone(l)).collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore").field("snapshot", &*self.inner.snapshot.borrow()).finish()
    }
}
