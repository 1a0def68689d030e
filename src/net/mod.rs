//! Networking modules for the backend REST API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `client` is the single dispatch path (CSRF header, 403 recovery, 401
//! signal, timeout). `auth`, `oauth`, and `favorites` are the typed calls
//! built on it; `types` and `endpoints` define the wire schema and routes.
//! `browser` provides the `fetch`/cookie implementations for hydrate builds.

pub mod auth;
#[cfg(feature = "hydrate")]
pub mod browser;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod favorites;
pub mod http;
pub mod oauth;
pub mod types;
