use super::*;
use crate::test_support::{Harness, Reply};
use std::cell::Cell;
use std::time::Duration;

fn count_unauthorized(h: &Harness) -> Rc<Cell<u32>> {
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    h.signal.subscribe(move || counter.set(counter.get() + 1));
    hits
}

// =============================================================
// CSRF header injection
// =============================================================

#[tokio::test]
async fn mutating_request_carries_token_when_cookie_present() {
    let h = Harness::new();
    h.tokens.set(Some("tok-1"));
    h.client.send(ApiRequest::post("/favorites/AAPL")).await.unwrap();
    let sent = h.transport.sent();
    assert_eq!(sent[0].header("X-XSRF-TOKEN"), Some("tok-1"));
}

#[tokio::test]
async fn safe_request_never_carries_token() {
    let h = Harness::new();
    h.tokens.set(Some("tok-1"));
    h.client.send(ApiRequest::get("/auth/me")).await.unwrap();
    assert_eq!(h.transport.sent()[0].header("X-XSRF-TOKEN"), None);
}

#[tokio::test]
async fn mutating_request_without_cookie_goes_out_bare() {
    let h = Harness::new();
    h.client.send(ApiRequest::delete("/favorites/AAPL")).await.unwrap();
    assert_eq!(h.transport.sent()[0].header("X-XSRF-TOKEN"), None);
}

#[tokio::test]
async fn token_is_read_fresh_for_each_request() {
    let h = Harness::new();
    h.tokens.set(Some("first"));
    h.client.send(ApiRequest::post("/auth/refresh")).await.unwrap();
    h.tokens.set(Some("rotated"));
    h.client.send(ApiRequest::post("/auth/refresh")).await.unwrap();
    let sent = h.transport.sent();
    assert_eq!(sent[0].header("X-XSRF-TOKEN"), Some("first"));
    assert_eq!(sent[1].header("X-XSRF-TOKEN"), Some("rotated"));
}

#[tokio::test]
async fn url_is_built_from_config_prefix() {
    let h = Harness::with_config(ClientConfig::with_origin("http://localhost:8080"));
    h.client.send(ApiRequest::get("/auth/me")).await.unwrap();
    assert_eq!(h.transport.urls(), vec!["http://localhost:8080/api/auth/me".to_owned()]);
}

// =============================================================
// 403 recovery
// =============================================================

#[tokio::test]
async fn forbidden_without_token_retries_once_with_fresh_token() {
    let h = Harness::new();
    h.transport.push(Reply::forbidden_with_token("fresh"));
    h.transport.push(Reply::status(200, r#"{"id":1,"email":"a@b.com"}"#));

    let resp = h.client.send(ApiRequest::post("/auth/login")).await.unwrap();

    assert_eq!(resp.status, 200);
    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].header("X-XSRF-TOKEN"), None);
    assert!(!sent[0].csrf_retry);
    assert_eq!(sent[1].header("X-XSRF-TOKEN"), Some("fresh"));
    assert!(sent[1].csrf_retry);
}

#[tokio::test]
async fn forbidden_on_retry_is_final() {
    let h = Harness::new();
    h.transport.push(Reply::forbidden_with_token("fresh"));
    h.transport.push(Reply::status(403, ""));
    h.transport.push(Reply::status(200, "{}"));

    let err = h.client.send(ApiRequest::post("/user-news")).await.unwrap_err();

    assert!(err.is_forbidden());
    assert_eq!(h.transport.calls(), 2);
}

#[tokio::test]
async fn forbidden_with_token_already_sent_is_not_retried() {
    let h = Harness::new();
    h.tokens.set(Some("stale"));
    h.transport.push(Reply::status(403, r#"{"message":"Invalid CSRF token"}"#));

    let err = h.client.send(ApiRequest::put("/auth/profile")).await.unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert_eq!(err.user_message(), "Invalid CSRF token");
    assert_eq!(h.transport.calls(), 1);
}

#[tokio::test]
async fn forbidden_retry_goes_out_even_if_cookie_never_arrives() {
    let h = Harness::new();
    h.transport.push(Reply::status(403, ""));
    h.transport.push(Reply::status(403, ""));

    let err = h.client.send(ApiRequest::post("/auth/register")).await.unwrap_err();

    assert!(err.is_forbidden());
    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].header("X-XSRF-TOKEN"), None);
}

#[tokio::test]
async fn forbidden_does_not_emit_unauthorized() {
    let h = Harness::new();
    let hits = count_unauthorized(&h);
    h.transport.push(Reply::status(403, ""));
    h.transport.push(Reply::status(403, ""));
    let _ = h.client.send(ApiRequest::post("/auth/login")).await;
    assert_eq!(hits.get(), 0);
}

// =============================================================
// 401 and other failures
// =============================================================

#[tokio::test]
async fn unauthorized_emits_signal_once_and_rejects() {
    let h = Harness::new();
    let hits = count_unauthorized(&h);
    h.transport.push(Reply::status(401, ""));

    let err = h.client.send(ApiRequest::get("/auth/me")).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(hits.get(), 1);
    assert_eq!(h.transport.calls(), 1);
}

#[tokio::test]
async fn each_unauthorized_response_emits_its_own_signal() {
    let h = Harness::new();
    let hits = count_unauthorized(&h);
    h.transport.push(Reply::status(401, ""));
    h.transport.push(Reply::status(401, ""));
    let _ = h.client.send(ApiRequest::get("/favorites")).await;
    let _ = h.client.send(ApiRequest::get("/favorites")).await;
    assert_eq!(hits.get(), 2);
}

#[tokio::test]
async fn validation_error_passes_through_unchanged() {
    let h = Harness::new();
    let hits = count_unauthorized(&h);
    h.transport.push(Reply::status(422, r#"{"message":"Titel fehlt"}"#));

    let err = h.client.send(ApiRequest::post("/user-news")).await.unwrap_err();

    assert_eq!(err, ApiError::Status { status: 422, message: Some("Titel fehlt".to_owned()) });
    assert_eq!(hits.get(), 0);
    assert_eq!(h.transport.calls(), 1);
}

#[tokio::test]
async fn network_failure_is_not_a_status_error() {
    let h = Harness::new();
    let hits = count_unauthorized(&h);
    h.transport.push(Reply::NetworkError("connection refused".to_owned()));

    let err = h.client.send(ApiRequest::post("/auth/refresh")).await.unwrap_err();

    assert_eq!(err, ApiError::Network("connection refused".to_owned()));
    assert_eq!(err.status(), None);
    assert_eq!(hits.get(), 0);
}

#[tokio::test(start_paused = true)]
async fn hung_request_times_out_as_network_class() {
    let h = Harness::new();
    h.transport.push(Reply::Hang);

    let started = tokio::time::Instant::now();
    let err = h.client.send(ApiRequest::post("/auth/refresh")).await.unwrap_err();

    assert_eq!(err, ApiError::Timeout(Duration::from_secs(30)));
    assert!(err.is_network());
    assert!(started.elapsed() >= Duration::from_secs(30));
}

// =============================================================
// JSON helpers
// =============================================================

#[tokio::test]
async fn send_json_encodes_body_and_decodes_reply() {
    #[derive(serde::Deserialize)]
    struct Echo {
        id: i64,
    }
    let h = Harness::new();
    h.transport.push(Reply::status(200, r#"{"id":7}"#));

    let echo: Echo = h
        .client
        .send_json(ApiRequest::post("/auth/login"), Some(&serde_json::json!({ "email": "a@b.com" })))
        .await
        .unwrap();

    assert_eq!(echo.id, 7);
    assert_eq!(h.transport.sent()[0].body.as_deref(), Some(r#"{"email":"a@b.com"}"#));
}

#[tokio::test]
async fn get_json_reports_decode_failure() {
    let h = Harness::new();
    h.transport.push(Reply::status(200, "not json"));
    let result: Result<serde_json::Map<String, serde_json::Value>, _> = h.client.get_json("/auth/export").await;
    assert!(matches!(result, Err(ApiError::Json(_))));
}
