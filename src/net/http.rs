//! Request/response values and the transport seams under the API client.
//!
//! DESIGN
//! ======
//! `ApiRequest` is the whole per-request configuration, including the
//! `csrf_retry` stamp, so a retried request carries its own "already
//! retried" marker no matter how many times it passes through the client.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use super::error::ApiError;
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Verbs with create/replace/update/delete semantics.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch | Self::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing call. `path` is relative to the API prefix (`/auth/me`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    /// JSON body, already serialized.
    pub body: Option<String>,
    /// Set when this request is the one CSRF recovery retry.
    pub csrf_retry: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: Vec::new(), body: None, csrf_retry: false }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Json` if `value` cannot be encoded.
    pub fn json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_string(value)?);
        Ok(self)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace a header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            slot.1 = value;
        } else {
            self.headers.push((name.to_owned(), value));
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Json` when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = if self.body.trim().is_empty() { "null" } else { self.body.as_str() };
        Ok(serde_json::from_str(body)?)
    }
}

/// Sends a fully prepared request. Implementations must always include
/// ambient session credentials (cookies).
///
/// `Err` means no response was received at all (network-class failure).
pub trait Transport {
    fn send<'a>(&'a self, url: String, request: &'a ApiRequest) -> LocalBoxFuture<'a, Result<ApiResponse, String>>;
}

/// Reads the current anti-forgery token. Called fresh for every request so
/// server-side rotation is picked up.
pub trait TokenSource {
    fn csrf_token(&self) -> Option<String>;
}

/// Extract cookie `name` from a `document.cookie` style string.
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_owned())
        .filter(|value| !value.is_empty())
}
