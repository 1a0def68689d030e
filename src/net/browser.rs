//! Browser implementations of the transport seams (hydrate builds only).
//!
//! `GlooTransport` issues `fetch` calls through `gloo-net` with
//! `credentials: include`, so the session and token cookies travel with
//! every request. `DocumentCookies` reads the token from `document.cookie`.

use futures::future::LocalBoxFuture;
use gloo_net::http::{Request, RequestBuilder};
use wasm_bindgen::JsCast;
use web_sys::RequestCredentials;

use super::http::{ApiRequest, ApiResponse, Method, TokenSource, Transport, cookie_value};

#[derive(Clone, Copy, Debug, Default)]
pub struct GlooTransport;

impl GlooTransport {
    fn builder(method: Method, url: &str) -> RequestBuilder {
        match method {
            Method::Get => Request::get(url),
            Method::Post => Request::post(url),
            Method::Put => Request::put(url),
            Method::Patch => Request::patch(url),
            Method::Delete => Request::delete(url),
        }
    }

    async fn fetch(url: String, request: &ApiRequest) -> Result<ApiResponse, String> {
        let mut builder = Self::builder(request.method, &url)
            .credentials(RequestCredentials::Include)
            .header("Content-Type", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let prepared = match &request.body {
            Some(body) => builder.body(body.clone()),
            None => builder.build(),
        }
        .map_err(|e| e.to_string())?;

        let resp = prepared.send().await.map_err(|e| e.to_string())?;
        let status = resp.status();
        // A body that cannot be read is treated as empty; the status decides.
        let body = resp.text().await.unwrap_or_default();
        Ok(ApiResponse::new(status, body))
    }
}

impl Transport for GlooTransport {
    fn send<'a>(&'a self, url: String, request: &'a ApiRequest) -> LocalBoxFuture<'a, Result<ApiResponse, String>> {
        Box::pin(Self::fetch(url, request))
    }
}

/// Anti-forgery token read from `document.cookie` on every call.
#[derive(Clone, Debug)]
pub struct DocumentCookies {
    name: String,
}

impl DocumentCookies {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TokenSource for DocumentCookies {
    fn csrf_token(&self) -> Option<String> {
        let document = web_sys::window()?.document()?;
        let cookies = document.dyn_into::<web_sys::HtmlDocument>().ok()?.cookie().ok()?;
        cookie_value(&cookies, &self.name)
    }
}
