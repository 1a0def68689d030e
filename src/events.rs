//! Typed broadcast for the "unauthorized detected" signal.
//!
//! SYSTEM CONTEXT
//! ==============
//! The API client and the heartbeat both observe session death; neither owns
//! auth state. They emit here and the auth store (the one subscriber that
//! mutates state) reacts. Other listeners may observe but must not clear.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Listener = Rc<dyn Fn()>;

/// Identifier returned by `subscribe`, used to detach a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct SignalInner {
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
    next_id: Cell<u64>,
}

/// Cloneable handle to a shared, payload-less broadcast channel.
#[derive(Clone, Default)]
pub struct UnauthorizedSignal {
    inner: Rc<SignalInner>,
}

impl UnauthorizedSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn() + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    /// Notify every current listener once.
    ///
    /// The listener list is snapshotted first so listeners may subscribe or
    /// unsubscribe while being notified.
    pub fn emit(&self) {
        let listeners: Vec<Listener> = self.inner.listeners.borrow().iter().map(|(_, l)| Rc::clone(l)).collect();
        log::debug!("unauthorized signal: notifying {} listener(s)", listeners.len());
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl std::fmt::Debug for UnauthorizedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnauthorizedSignal").field("listeners", &self.listener_count()).finish()
    }
}
