//! Client configuration with build-time defaults.
//!
//! SYSTEM CONTEXT
//! ==============
//! The composition root builds one `ClientConfig` and hands it to the API
//! client and the heartbeat. The backend origin is baked in at build time
//! from `API_URL`; an empty value means same-origin relative requests.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30 * 60;
pub const CSRF_COOKIE_NAME: &str = "XSRF-TOKEN";
pub const CSRF_HEADER_NAME: &str = "X-XSRF-TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:8080`. Empty for same-origin.
    pub api_origin: String,
    /// Path prefix prepended to every endpoint.
    pub api_prefix: String,
    pub request_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub csrf_cookie: String,
    pub csrf_header: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::with_origin(option_env!("API_URL").unwrap_or_default())
    }
}

impl ClientConfig {
    /// Build a config for `origin`, keeping every other default.
    pub fn with_origin(origin: &str) -> Self {
        Self {
            api_origin: origin.trim_end_matches('/').to_owned(),
            api_prefix: DEFAULT_API_PREFIX.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            csrf_cookie: CSRF_COOKIE_NAME.to_owned(),
            csrf_header: CSRF_HEADER_NAME.to_owned(),
        }
    }

    /// Absolute (or origin-relative) URL for an endpoint path like `/auth/me`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}{}", self.api_origin, self.api_prefix, path)
    }
}
