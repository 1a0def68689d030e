//! Uniform request dispatch to the backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every backend call in the crate (auth handlers, favorites, heartbeat)
//! goes through `ApiClient::send`. The client stamps the anti-forgery header
//! on mutating verbs, applies the request timeout, and classifies failures.
//!
//! ERROR HANDLING
//! ==============
//! - 401 emits the unauthorized signal, then fails the call so the caller's
//!   own error path still runs.
//! - 403 on a request sent without the token header is the "token not yet
//!   issued" race: the 403 response sets the cookie, so after one scheduler
//!   tick the request is resent once with the fresh token. Nothing else is
//!   ever retried here.
//! - No response at all is `Network`/`Timeout`, never a status error.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::rc::Rc;

use futures::future::{Either, select};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::http::{ApiRequest, ApiResponse, TokenSource, Transport};
use crate::config::ClientConfig;
use crate::events::UnauthorizedSignal;
use crate::runtime::Runtime;

struct ClientInner {
    config: ClientConfig,
    transport: Rc<dyn Transport>,
    tokens: Rc<dyn TokenSource>,
    runtime: Rc<dyn Runtime>,
    unauthorized: UnauthorizedSignal,
}

/// Cheaply cloneable handle to the shared HTTP client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Rc<ClientInner>,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        transport: Rc<dyn Transport>,
        tokens: Rc<dyn TokenSource>,
        runtime: Rc<dyn Runtime>,
        unauthorized: UnauthorizedSignal,
    ) -> Self {
        Self { inner: Rc::new(ClientInner { config, transport, tokens, runtime, unauthorized }) }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn runtime(&self) -> Rc<dyn Runtime> {
        Rc::clone(&self.inner.runtime)
    }

    pub fn unauthorized_signal(&self) -> &UnauthorizedSignal {
        &self.inner.unauthorized
    }

    /// Send `request`, returning the response only for 2xx statuses.
    ///
    /// # Errors
    ///
    /// `ApiError::Status` for non-2xx responses, `Network`/`Timeout` when no
    /// response arrived.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let header = self.inner.config.csrf_header.as_str();
        if request.method.is_mutating() {
            match self.inner.tokens.csrf_token() {
                Some(token) => request.set_header(header, token),
                None => log::debug!("[csrf] no token for {} {}", request.method, request.path),
            }
        }

        loop {
            let carried_token = request.header(header).is_some();
            log::debug!("[api] {} {}", request.method, request.path);
            let response = self.dispatch(&request).await?;
            if response.ok() {
                return Ok(response);
            }

            if response.status == 403 && !carried_token && !request.csrf_retry {
                request.csrf_retry = true;
                self.inner.runtime.yield_now().await;
                match self.inner.tokens.csrf_token() {
                    Some(token) => request.set_header(header, token),
                    None => log::warn!("[csrf] still no token after 403 on {}", request.path),
                }
                log::info!("[csrf] retrying {} {} once after 403", request.method, request.path);
                continue;
            }

            if response.status == 401 {
                log::warn!("[api] session expired or unauthorized ({})", request.path);
                self.inner.unauthorized.emit();
            }
            log::debug!("[api] {} {} failed: {}", request.method, request.path, response.status);
            return Err(ApiError::from_status(response.status, &response.body));
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let timeout = self.inner.config.request_timeout;
        let url = self.inner.config.url_for(&request.path);
        let send = self.inner.transport.send(url, request);
        match select(send, self.inner.runtime.sleep(timeout)).await {
            Either::Left((Ok(response), _)) => Ok(response),
            Either::Left((Err(err), _)) => {
                log::error!("[api] network error or backend unavailable: {err}");
                Err(ApiError::Network(err))
            }
            Either::Right(((), _)) => {
                log::error!("[api] {} {} timed out after {timeout:?}", request.method, request.path);
                Err(ApiError::Timeout(timeout))
            }
        }
    }

    /// `GET path` decoded as JSON.
    ///
    /// # Errors
    ///
    /// Any `send` error, or `ApiError::Json` for an unexpected body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    /// Send `request` with an optional JSON body and decode the JSON reply.
    ///
    /// # Errors
    ///
    /// Any `send` error, or `ApiError::Json` on encode/decode failure.
    pub async fn send_json<B, T>(&self, request: ApiRequest, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = match body {
            Some(body) => request.json(body)?,
            None => request,
        };
        self.send(request).await?.json()
    }
}
