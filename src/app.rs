//! Browser composition root (hydrate builds only).
//!
//! SYSTEM CONTEXT
//! ==============
//! `SessionServices::browser` wires the real transport, cookie jar, storage,
//! and timers into one set of services. `SessionRoot` owns them for the
//! lifetime of the mounted tree: it mirrors the auth store into a Leptos
//! signal, installs the session lifecycle, kicks off the identity restore,
//! and tears everything down in `on_cleanup`. Pages read both from context.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::hooks::{use_navigate, use_query_map};
use leptos_router::path;
use wasm_bindgen::prelude::wasm_bindgen;

use crate::config::ClientConfig;
use crate::events::UnauthorizedSignal;
use crate::net::auth::AuthApi;
use crate::net::browser::{DocumentCookies, GlooTransport};
use crate::net::client::ApiClient;
use crate::net::favorites::FavoritesApi;
use crate::net::oauth::{CallbackParams, OAuthFlow};
use crate::runtime::BrowserRuntime;
use crate::session::heartbeat::SessionHeartbeat;
use crate::session::lifecycle::SessionLifecycle;
use crate::state::auth::{AuthSnapshot, AuthStore};
use crate::util::auth::{OAUTH_CALLBACK_PATH, install_unauth_redirect};
use crate::util::storage::BrowserStorage;

/// Every session-related service, built once per mounted app.
#[derive(Clone)]
pub struct SessionServices {
    pub store: AuthStore,
    pub client: ApiClient,
    pub heartbeat: SessionHeartbeat,
    pub auth: AuthApi,
    pub oauth: OAuthFlow,
    pub favorites: FavoritesApi,
}

impl SessionServices {
    pub fn browser(config: ClientConfig) -> Self {
        let signal = UnauthorizedSignal::new();
        let store = AuthStore::load(Rc::new(BrowserStorage::Local));
        store.bind_unauthorized(&signal);

        let tokens = DocumentCookies::new(config.csrf_cookie.clone());
        let client =
            ApiClient::new(config, Rc::new(GlooTransport), Rc::new(tokens), Rc::new(BrowserRuntime), signal);
        let heartbeat = SessionHeartbeat::new(client.clone());
        let auth = AuthApi::new(client.clone(), store.clone());
        let oauth = OAuthFlow::new(client.clone(), store.clone(), Rc::new(BrowserStorage::Session));
        let favorites = FavoritesApi::new(client.clone());
        Self { store, client, heartbeat, auth, oauth, favorites }
    }
}

/// Services handle placed in context. Local storage because the services
/// are `Rc`-based and never leave the JS thread.
pub type ServicesHandle = StoredValue<Option<SessionServices>, LocalStorage>;

/// Fetch the services from context. `None` after teardown.
pub fn use_services() -> Option<SessionServices> {
    use_context::<ServicesHandle>().and_then(|handle| handle.get_value())
}

/// Owns the session services for everything rendered inside it.
///
/// Provides `RwSignal<AuthSnapshot>` (mirror of the store) and
/// `RwSignal<bool>` wrapped in `IdentityCheck` (true while `/auth/me` runs).
#[component]
pub fn SessionRoot(children: Children) -> impl IntoView {
    let services = SessionServices::browser(ClientConfig::default());

    let auth = RwSignal::new(services.store.snapshot());
    let checking = RwSignal::new(services.store.is_authenticated());
    let mirror = services.store.subscribe(move |snapshot| auth.set(snapshot.clone()));

    let navigate = use_navigate();
    let lifecycle = SessionLifecycle::install(services.store.clone(), services.heartbeat.clone(), move |path| {
        navigate(path, NavigateOptions { replace: true, ..NavigateOptions::default() });
    });

    let restore = services.auth.clone();
    leptos::task::spawn_local(async move {
        if let Err(err) = restore.fetch_current_user().await {
            log::warn!("[session] identity restore failed: {err}");
        }
        checking.set(false);
    });

    let handle: ServicesHandle = StoredValue::new_local(Some(services));
    let lifecycle = StoredValue::new_local(Some(lifecycle));
    provide_context(handle);
    provide_context(auth);
    provide_context(IdentityCheck(checking));

    on_cleanup(move || {
        if let Some(Some(lifecycle)) = lifecycle.try_update_value(Option::take) {
            lifecycle.teardown();
        }
        if let Some(Some(services)) = handle.try_update_value(Option::take) {
            services.store.unsubscribe(mirror);
        }
    });

    children()
}

/// True while the startup identity check is still running.
#[derive(Clone, Copy, Debug)]
pub struct IdentityCheck(pub RwSignal<bool>);

/// Provider redirect target: validates `state`, exchanges the code, then
/// replaces the history entry with the post-login page.
#[component]
pub fn OAuthCallback() -> impl IntoView {
    let query = use_query_map();
    let navigate = use_navigate();
    let message = RwSignal::new(String::from("Anmeldung wird abgeschlossen..."));

    let params = query.with_untracked(|q| CallbackParams {
        code: q.get("code").filter(|v| !v.is_empty()),
        state: q.get("state").filter(|v| !v.is_empty()),
        error: q.get("error").filter(|v| !v.is_empty()),
    });

    if let Some(services) = use_services() {
        leptos::task::spawn_local(async move {
            match services.oauth.complete_google_login(&params).await {
                Ok(login) => {
                    navigate(login.redirect_path(), NavigateOptions { replace: true, ..NavigateOptions::default() });
                }
                Err(err) => {
                    log::error!("[oauth] callback failed: {err}");
                    message.set(err.user_message());
                }
            }
        });
    }

    log::debug!("[oauth] callback mounted at {OAUTH_CALLBACK_PATH}");
    view! { <p class="oauth-callback">{move || message.get()}</p> }
}

/// Authenticated landing route. Sends anonymous visitors to `/login` once
/// the startup identity check has finished.
#[component]
pub fn Dashboard() -> impl IntoView {
    let auth = expect_context::<RwSignal<AuthSnapshot>>();
    let IdentityCheck(checking) = expect_context::<IdentityCheck>();
    install_unauth_redirect(auth, checking, use_navigate());

    let email = move || auth.with(|a| a.user().map(|u| u.email.clone()).unwrap_or_default());
    view! { <p class="dashboard-user">{email}</p> }
}

#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <SessionRoot>
                <Routes fallback=|| ()>
                    <Route path=path!("/oauth2/callback/google") view=OAuthCallback />
                    <Route path=path!("/dashboard") view=Dashboard />
                </Routes>
            </SessionRoot>
        </Router>
    }
}

/// WASM entry point.
#[wasm_bindgen]
pub fn mount() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    leptos::mount::mount_to_body(App);
}
