//! Session keep-alive heartbeat.
//!
//! While the user is signed in, `POST /auth/refresh` runs on a fixed
//! interval (30 minutes in production) to slide the server-side session
//! expiry. The first refresh fires one full interval after `start`, never
//! immediately: on reload `/auth/me` already touched the session, and a
//! second concurrent session call can race it.
//!
//! ERROR HANDLING
//! ==============
//! A tick never propagates an error. 401 stops the loop, reports expiry once,
//! and re-emits the unauthorized signal so every listener converges on the
//! same shutdown path. Any other failure is reported via `on_error` and the
//! loop keeps going; the next tick may well succeed.

#[cfg(test)]
#[path = "heartbeat_test.rs"]
mod heartbeat_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{AbortHandle, Abortable};

use crate::net::client::ApiClient;
use crate::net::endpoints;
use crate::net::error::ApiError;
use crate::net::http::ApiRequest;
use crate::net::types::RefreshResponse;

const SECONDS_PER_DAY: u64 = 86_400;

/// Callbacks invoked from heartbeat ticks. `configure` merges these: a
/// `None` field leaves the currently configured callback in place.
#[derive(Clone, Default)]
pub struct HeartbeatCallbacks {
    pub on_session_expired: Option<Rc<dyn Fn()>>,
    pub on_session_refreshed: Option<Rc<dyn Fn(u64)>>,
    pub on_error: Option<Rc<dyn Fn(&ApiError)>>,
}

impl HeartbeatCallbacks {
    fn merge(&mut self, other: HeartbeatCallbacks) {
        if other.on_session_expired.is_some() {
            self.on_session_expired = other.on_session_expired;
        }
        if other.on_session_refreshed.is_some() {
            self.on_session_refreshed = other.on_session_refreshed;
        }
        if other.on_error.is_some() {
            self.on_error = other.on_error;
        }
    }
}

/// Outcome of a single refresh, as classified by the heartbeat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Refreshed { expires_in: u64 },
    Expired,
    Failed(ApiError),
    /// Previous refresh still in flight.
    Skipped,
}

struct HeartbeatInner {
    client: ApiClient,
    interval: Duration,
    timer: RefCell<Option<AbortHandle>>,
    in_flight: Cell<bool>,
    callbacks: RefCell<HeartbeatCallbacks>,
}

/// Handle to the application's heartbeat service. Clones share the same
/// timer, so any number of owners still yields at most one loop.
#[derive(Clone)]
pub struct SessionHeartbeat {
    inner: Rc<HeartbeatInner>,
}

impl SessionHeartbeat {
    /// Heartbeat using the interval from the client's config.
    pub fn new(client: ApiClient) -> Self {
        let interval = client.config().heartbeat_interval;
        Self::with_interval(client, interval)
    }

    pub fn with_interval(client: ApiClient, interval: Duration) -> Self {
        Self {
            inner: Rc::new(HeartbeatInner {
                client,
                interval,
                timer: RefCell::new(None),
                in_flight: Cell::new(false),
                callbacks: RefCell::new(HeartbeatCallbacks::default()),
            }),
        }
    }

    pub fn configure(&self, callbacks: HeartbeatCallbacks) {
        self.inner.callbacks.borrow_mut().merge(callbacks);
    }

    pub fn is_active(&self) -> bool {
        self.inner.timer.borrow().is_some()
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Start the refresh loop. No-op while already running.
    pub fn start(&self) {
        if self.is_active() {
            log::debug!("[heartbeat] already running");
            return;
        }
        log::info!("[heartbeat] starting (interval {:?}, first refresh after one interval)", self.inner.interval);

        let (handle, registration) = AbortHandle::new_pair();
        *self.inner.timer.borrow_mut() = Some(handle);

        let runtime = self.inner.client.runtime();
        let weak = Rc::downgrade(&self.inner);
        let interval = self.inner.interval;
        let ticker = {
            let runtime = Rc::clone(&runtime);
            async move {
                loop {
                    runtime.sleep(interval).await;
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    runtime.spawn(Self { inner }.tick().map(|_| ()).boxed_local());
                }
            }
        };
        runtime.spawn(Abortable::new(ticker, registration).map(|_| ()).boxed_local());
    }

    /// Stop the refresh loop. No-op when not running.
    ///
    /// Only future ticks are cancelled. A refresh already waiting on the
    /// backend still completes, and a 401 from it still reports expiry.
    pub fn stop(&self) {
        let handle = self.inner.timer.borrow_mut().take();
        if let Some(handle) = handle {
            log::info!("[heartbeat] stopping");
            handle.abort();
        }
    }

    /// Run one refresh now and route the outcome to the callbacks.
    pub async fn tick(self) -> TickOutcome {
        if self.inner.in_flight.replace(true) {
            log::debug!("[heartbeat] previous refresh still pending, skipping tick");
            return TickOutcome::Skipped;
        }
        let result = self.refresh().await;
        self.inner.in_flight.set(false);

        match result {
            Ok(expires_in) => {
                log::info!(
                    "[heartbeat] session refreshed, expires in {expires_in}s (~{} days)",
                    expires_in / SECONDS_PER_DAY
                );
                let callback = self.inner.callbacks.borrow().on_session_refreshed.clone();
                if let Some(callback) = callback {
                    callback(expires_in);
                }
                TickOutcome::Refreshed { expires_in }
            }
            Err(err) if err.is_unauthorized() => {
                log::warn!("[heartbeat] session expired (401)");
                self.handle_session_expired();
                TickOutcome::Expired
            }
            Err(err) => {
                log::error!("[heartbeat] refresh failed: {err}");
                let callback = self.inner.callbacks.borrow().on_error.clone();
                if let Some(callback) = callback {
                    callback(&err);
                }
                TickOutcome::Failed(err)
            }
        }
    }

    async fn refresh(&self) -> Result<u64, ApiError> {
        let response = self.inner.client.send(ApiRequest::post(endpoints::AUTH_REFRESH)).await?;
        let body: RefreshResponse = response.json()?;
        Ok(body.expires_in)
    }

    fn handle_session_expired(&self) {
        self.stop();
        let callback = self.inner.callbacks.borrow().on_session_expired.clone();
        if let Some(callback) = callback {
            callback();
        }
        self.inner.client.unauthorized_signal().emit();
    }
}

impl Drop for HeartbeatInner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().take() {
            handle.abort();
        }
    }
}
