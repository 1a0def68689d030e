//! Durable key/value storage for client state.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth store persists its snapshot through `KeyValueStorage`; the OAuth
//! flow keeps its `state` nonce in the tab-scoped session storage. Browser
//! builds back this with `localStorage`/`sessionStorage`; native builds and
//! tests use `MemoryStorage`.
//!
//! ERROR HANDLING
//! ==============
//! Storage is best-effort: quota errors, private-mode failures, and corrupt
//! JSON degrade to "nothing stored" instead of failing the caller.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// Load a JSON value stored under `key`.
pub fn load_json<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<T> {
    let raw = storage.get_item(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("[storage] discarding unreadable `{key}`: {err}");
            None
        }
    }
}

/// Save a JSON value under `key`.
pub fn save_json<T: Serialize>(storage: &dyn KeyValueStorage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => storage.set_item(key, &raw),
        Err(err) => log::warn!("[storage] could not encode `{key}`: {err}"),
    }
}

/// In-process storage; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items.borrow_mut().insert(key.to_owned(), value.to_owned());
    }

    fn remove_item(&self, key: &str) {
        self.items.borrow_mut().remove(key);
    }
}

#[cfg(feature = "hydrate")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrowserStorage {
    /// `window.localStorage`: survives reloads and restarts.
    Local,
    /// `window.sessionStorage`: scoped to the tab, survives redirects.
    Session,
}

#[cfg(feature = "hydrate")]
impl BrowserStorage {
    fn storage(self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        let storage = match self {
            Self::Local => window.local_storage(),
            Self::Session => window.session_storage(),
        };
        storage.ok().flatten()
    }
}

#[cfg(feature = "hydrate")]
impl KeyValueStorage for BrowserStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.storage()?.get_item(key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) {
        let Some(storage) = self.storage() else {
            return;
        };
        let _ = storage.set_item(key, value);
    }

    fn remove_item(&self, key: &str) {
        if let Some(storage) = self.storage() {
            let _ = storage.remove_item(key);
        }
    }
}
