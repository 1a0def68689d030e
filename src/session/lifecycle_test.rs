use super::*;
use std::cell::RefCell;
use std::time::Duration;

use crate::net::auth::AuthApi;
use crate::net::endpoints;
use crate::net::error::ApiError;
use crate::net::http::ApiRequest;
use crate::net::types::User;
use crate::test_support::{Harness, Reply, settle};
use crate::util::storage::{KeyValueStorage, MemoryStorage};
use tokio::task::LocalSet;

const INTERVAL: Duration = Duration::from_secs(30 * 60);
const EPSILON: Duration = Duration::from_millis(1);

fn alice() -> User {
    User { id: 1, email: "a@b.com".to_owned() }
}

struct World {
    h: Harness,
    store: AuthStore,
    heartbeat: SessionHeartbeat,
    lifecycle: SessionLifecycle,
    navigations: Rc<RefCell<Vec<String>>>,
    transitions: Rc<Cell<u32>>,
}

fn world_with(storage: MemoryStorage) -> World {
    let h = Harness::new();
    let store = AuthStore::load(Rc::new(storage));
    store.bind_unauthorized(&h.signal);
    let heartbeat = SessionHeartbeat::new(h.client.clone());

    let navigations = Rc::new(RefCell::new(Vec::new()));
    let lifecycle = {
        let navigations = Rc::clone(&navigations);
        SessionLifecycle::install(store.clone(), heartbeat.clone(), move |path| {
            navigations.borrow_mut().push(path.to_owned());
        })
    };

    let transitions = Rc::new(Cell::new(0));
    {
        let transitions = Rc::clone(&transitions);
        store.subscribe(move |_| transitions.set(transitions.get() + 1));
    }
    World { h, store, heartbeat, lifecycle, navigations, transitions }
}

fn world() -> World {
    world_with(MemoryStorage::new())
}

async fn advance(by: Duration) {
    tokio::time::sleep(by).await;
    settle().await;
}

// =============================================================
// Store-driven start/stop
// =============================================================

#[tokio::test(start_paused = true)]
async fn anonymous_start_leaves_heartbeat_idle() {
    LocalSet::new()
        .run_until(async {
            let w = world();
            assert!(!w.heartbeat.is_active());
            advance(INTERVAL * 2).await;
            assert_eq!(w.h.transport.calls(), 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn persisted_session_starts_heartbeat_on_install() {
    LocalSet::new()
        .run_until(async {
            let storage = MemoryStorage::new();
            storage.set_item(
                crate::state::auth::STORAGE_KEY,
                r#"{"state":{"user":{"id":1,"email":"a@b.com"},"isAuthenticated":true},"version":0}"#,
            );
            let w = world_with(storage);
            assert!(w.heartbeat.is_active());

            advance(INTERVAL + EPSILON).await;
            assert_eq!(w.h.transport.calls_to(endpoints::AUTH_REFRESH), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn login_starts_heartbeat() {
    LocalSet::new()
        .run_until(async {
            let w = world();
            let auth = AuthApi::new(w.h.client.clone(), w.store.clone());
            w.h.transport.push(Reply::status(200, r#"{"id":1,"email":"a@b.com"}"#));

            auth.login(&crate::net::types::Credentials {
                email: "a@b.com".to_owned(),
                password: "pw".to_owned(),
            })
            .await
            .unwrap();

            assert_eq!(w.store.snapshot(), AuthSnapshot::from_user(Some(alice())));
            assert!(w.heartbeat.is_active());

            advance(INTERVAL + EPSILON).await;
            assert_eq!(w.h.transport.calls_to(endpoints::AUTH_REFRESH), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn logout_stops_heartbeat() {
    LocalSet::new()
        .run_until(async {
            let w = world();
            let auth = AuthApi::new(w.h.client.clone(), w.store.clone());
            w.store.set_user(Some(alice()));
            assert!(w.heartbeat.is_active());

            auth.logout().await.unwrap();

            assert_eq!(w.store.snapshot(), AuthSnapshot::anonymous());
            assert!(!w.heartbeat.is_active());
            advance(INTERVAL * 2).await;
            assert_eq!(w.h.transport.calls_to(endpoints::AUTH_REFRESH), 0);
            assert!(w.navigations.borrow().is_empty());
        })
        .await;
}

// =============================================================
// Expiry and failure paths
// =============================================================

#[tokio::test(start_paused = true)]
async fn expired_session_signs_out_and_redirects_once() {
    LocalSet::new()
        .run_until(async {
            let w = world();
            w.store.set_user(Some(alice()));
            w.transitions.set(0);
            w.h.transport.push(Reply::status(401, ""));

            advance(INTERVAL + EPSILON).await;

            assert_eq!(w.store.snapshot(), AuthSnapshot::anonymous());
            assert!(!w.heartbeat.is_active());
            assert_eq!(*w.navigations.borrow(), vec![LOGIN_PATH.to_owned()]);
            assert_eq!(w.transitions.get(), 1);

            advance(INTERVAL * 2).await;
            assert_eq!(w.h.transport.calls(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn network_failure_keeps_session() {
    LocalSet::new()
        .run_until(async {
            let w = world();
            let errors = Rc::new(RefCell::new(Vec::<ApiError>::new()));
            {
                let errors = Rc::clone(&errors);
                w.heartbeat.configure(HeartbeatCallbacks {
                    on_error: Some(Rc::new(move |err| errors.borrow_mut().push(err.clone()))),
                    ..HeartbeatCallbacks::default()
                });
            }
            w.store.set_user(Some(alice()));
            w.h.transport.push(Reply::NetworkError("offline".to_owned()));

            advance(INTERVAL + EPSILON).await;

            assert_eq!(w.store.user(), Some(alice()));
            assert!(w.heartbeat.is_active());
            assert_eq!(*errors.borrow(), vec![ApiError::Network("offline".to_owned())]);
            assert!(w.navigations.borrow().is_empty());

            advance(INTERVAL).await;
            assert_eq!(w.h.transport.calls_to(endpoints::AUTH_REFRESH), 2);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_unauthorized_responses_converge_on_one_transition() {
    LocalSet::new()
        .run_until(async {
            let w = world();
            w.store.set_user(Some(alice()));
            w.transitions.set(0);
            w.h.transport.push(Reply::status(401, ""));
            w.h.transport.push(Reply::status(401, ""));

            let (tick, me) = futures::join!(
                w.heartbeat.clone().tick(),
                w.h.client.send(ApiRequest::get(endpoints::AUTH_ME)),
            );

            assert_eq!(tick, crate::session::heartbeat::TickOutcome::Expired);
            assert!(me.unwrap_err().is_unauthorized());
            assert_eq!(w.transitions.get(), 1);
            assert_eq!(w.store.snapshot(), AuthSnapshot::anonymous());
            assert!(!w.heartbeat.is_active());
            assert_eq!(w.navigations.borrow().len(), 1);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn api_unauthorized_alone_stops_heartbeat_without_redirect() {
    LocalSet::new()
        .run_until(async {
            let w = world();
            w.store.set_user(Some(alice()));
            w.h.transport.push(Reply::status(401, ""));

            let _ = w.h.client.send(ApiRequest::get(endpoints::AUTH_ME)).await;

            assert!(!w.store.is_authenticated());
            assert!(!w.heartbeat.is_active());
            // Route guards own the redirect for plain API failures.
            assert!(w.navigations.borrow().is_empty());
        })
        .await;
}

// =============================================================
// Teardown
// =============================================================

#[tokio::test(start_paused = true)]
async fn teardown_detaches_and_stops() {
    LocalSet::new()
        .run_until(async {
            let w = world();
            w.store.set_user(Some(alice()));
            w.lifecycle.teardown();
            w.lifecycle.teardown();

            assert!(!w.heartbeat.is_active());
            w.store.clear_user();
            w.store.set_user(Some(alice()));
            assert!(!w.heartbeat.is_active());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn dropping_lifecycle_stops_heartbeat() {
    LocalSet::new()
        .run_until(async {
            let World { h, store, heartbeat, lifecycle, .. } = world();
            store.set_user(Some(alice()));
            drop(lifecycle);

            assert!(!heartbeat.is_active());
            advance(INTERVAL * 2).await;
            assert_eq!(h.transport.calls(), 0);
        })
        .await;
}
