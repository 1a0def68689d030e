//! Scheduling seam between session logic and the host event loop.
//!
//! In the browser everything runs on the single JS event loop: `spawn` maps
//! to `spawn_local`, `sleep` to `setTimeout`. Tests substitute a paused
//! tokio clock so interval behavior is deterministic.

use futures::future::LocalBoxFuture;
use std::time::Duration;

/// Single-threaded task scheduling and timers.
pub trait Runtime {
    /// Run `task` detached on the local event loop.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);

    /// Resolve after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;

    /// Give pending event-loop work (e.g. committing a `Set-Cookie`) one turn.
    fn yield_now(&self) -> LocalBoxFuture<'static, ()> {
        self.sleep(Duration::ZERO)
    }
}

/// Browser runtime backed by `wasm-bindgen-futures` and `gloo-timers`.
#[cfg(feature = "hydrate")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserRuntime;

#[cfg(feature = "hydrate")]
impl Runtime for BrowserRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(gloo_timers::future::sleep(duration))
    }
}
