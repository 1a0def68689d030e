//! Shared fakes for native tests: scripted transport, in-memory cookie jar,
//! and a tokio-backed runtime for use inside a `LocalSet`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;

use crate::config::ClientConfig;
use crate::events::UnauthorizedSignal;
use crate::net::client::ApiClient;
use crate::net::http::{ApiRequest, ApiResponse, TokenSource, Transport};
use crate::runtime::Runtime;

/// One scripted transport outcome.
#[derive(Clone, Debug)]
pub enum Reply {
    Status { status: u16, body: String, set_token: Option<String> },
    NetworkError(String),
    /// Never resolves; used to exercise the request timeout.
    Hang,
}

impl Reply {
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status { status, body: body.to_owned(), set_token: None }
    }

    /// A 403 whose response also sets a fresh token cookie.
    pub fn forbidden_with_token(token: &str) -> Self {
        Self::Status { status: 403, body: String::new(), set_token: Some(token.to_owned()) }
    }
}

/// Cookie jar standing in for `document.cookie`.
#[derive(Clone, Default)]
pub struct MemoryTokens {
    token: Rc<RefCell<Option<String>>>,
}

impl MemoryTokens {
    pub fn with(token: &str) -> Self {
        let tokens = Self::default();
        tokens.set(Some(token));
        tokens
    }

    pub fn set(&self, token: Option<&str>) {
        *self.token.borrow_mut() = token.map(str::to_owned);
    }
}

impl TokenSource for MemoryTokens {
    fn csrf_token(&self) -> Option<String> {
        self.token.borrow().clone()
    }
}

/// Records every request and answers from a script. When the script is
/// exhausted it answers `200 {}`.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Rc<RefCell<VecDeque<Reply>>>,
    sent: Rc<RefCell<Vec<(String, ApiRequest)>>>,
    jar: MemoryTokens,
}

impl MockTransport {
    pub fn new(jar: MemoryTokens) -> Self {
        Self { jar, ..Self::default() }
    }

    pub fn push(&self, reply: Reply) -> &Self {
        self.script.borrow_mut().push_back(reply);
        self
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.borrow().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn calls(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.sent.borrow().iter().filter(|(_, r)| r.path == path).count()
    }
}

impl Transport for MockTransport {
    fn send<'a>(&'a self, url: String, request: &'a ApiRequest) -> LocalBoxFuture<'a, Result<ApiResponse, String>> {
        self.sent.borrow_mut().push((url, request.clone()));
        let reply = self.script.borrow_mut().pop_front();
        Box::pin(async move {
            match reply {
                None => Ok(ApiResponse::new(200, "{}")),
                Some(Reply::Status { status, body, set_token }) => {
                    if let Some(token) = set_token {
                        self.jar.set(Some(&token));
                    }
                    Ok(ApiResponse::new(status, body))
                }
                Some(Reply::NetworkError(msg)) => Err(msg),
                Some(Reply::Hang) => futures::future::pending().await,
            }
        })
    }
}

/// Runtime for tests running inside `tokio::task::LocalSet`.
#[derive(Clone, Copy, Default)]
pub struct TokioRuntime;

impl Runtime for TokioRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }

    fn yield_now(&self) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::task::yield_now())
    }
}

/// Let spawned local tasks run until they park on a timer or I/O.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Wiring shared by most session tests.
pub struct Harness {
    pub transport: MockTransport,
    pub tokens: MemoryTokens,
    pub signal: UnauthorizedSignal,
    pub client: ApiClient,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::with_origin(""))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let tokens = MemoryTokens::default();
        let transport = MockTransport::new(tokens.clone());
        let signal = UnauthorizedSignal::new();
        let client = ApiClient::new(
            config,
            Rc::new(transport.clone()),
            Rc::new(tokens.clone()),
            Rc::new(TokioRuntime),
            signal.clone(),
        );
        Self { transport, tokens, signal, client }
    }
}
