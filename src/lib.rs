//! Browser-side session core for the StockPulse web client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Keeps a logged-in session alive and recovers from CSRF token races:
//! `net::client` dispatches every backend call, `state::auth` holds who is
//! signed in, and `session` runs the keep-alive heartbeat off store
//! transitions. Everything except `app` and the browser seams is plain Rust
//! and tested natively; browser glue sits behind the `hydrate` feature.

#[cfg(feature = "hydrate")]
pub mod app;
pub mod config;
pub mod events;
pub mod net;
pub mod runtime;
pub mod session;
pub mod state;
pub mod util;

#[cfg(test)]
mod test_support;
