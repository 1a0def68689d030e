//! Google sign-in: authorization URL hand-off and callback completion.
//!
//! SYSTEM CONTEXT
//! ==============
//! `begin_google_login` asks the backend for the provider URL and remembers
//! its `state` nonce in tab-scoped storage. The provider redirects back to
//! the frontend callback route, which calls `complete_google_login`: the
//! returned `state` must match the remembered one before the code is handed
//! to the backend. The backend call is a same-origin fetch, so the session
//! cookie it sets is stored before any navigation happens.

#[cfg(test)]
#[path = "oauth_test.rs"]
mod oauth_test;

use std::rc::Rc;

use url::Url;

use super::client::ApiClient;
use super::endpoints;
use super::error::ApiError;
use super::types::{OAuthCallbackResponse, OAuthUrlResponse, User};
use crate::state::auth::AuthStore;
use crate::util::auth::post_login_path;
use crate::util::storage::KeyValueStorage;

/// Session-storage key for the pending `state` nonce.
pub const OAUTH_STATE_KEY: &str = "oauth_state";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OAuthError {
    #[error("sign-in was cancelled at the provider")]
    AccessDenied,

    #[error("provider reported error `{0}`")]
    Provider(String),

    #[error("callback is missing `code` or `state`")]
    MissingParameters,

    #[error("callback state does not match the pending sign-in")]
    StateMismatch,

    #[error("invalid authorization URL: {0}")]
    InvalidAuthUrl(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl OAuthError {
    pub fn user_message(&self) -> String {
        match self {
            Self::AccessDenied => "Du hast die Google-Anmeldung abgebrochen.".to_owned(),
            Self::Provider(_) | Self::InvalidAuthUrl(_) => "Google-Anmeldung fehlgeschlagen.".to_owned(),
            Self::MissingParameters => "Ungültige OAuth-Parameter.".to_owned(),
            Self::StateMismatch => {
                "Sicherheitsfehler: OAuth-State stimmt nicht überein. Bitte versuche es erneut.".to_owned()
            }
            Self::Api(ApiError::Status { message: Some(message), .. }) => message.clone(),
            Self::Api(_) => "Google-Anmeldung fehlgeschlagen. Bitte versuche es erneut.".to_owned(),
        }
    }
}

/// Query parameters the provider appends to the callback URL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let slot = match &*key {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                _ => continue,
            };
            if !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthLogin {
    pub user: User,
    pub is_new_user: bool,
}

impl OAuthLogin {
    /// Where to send the user after a completed sign-in.
    pub fn redirect_path(&self) -> &'static str {
        post_login_path(self.is_new_user)
    }
}

#[derive(Clone)]
pub struct OAuthFlow {
    client: ApiClient,
    store: AuthStore,
    pending: Rc<dyn KeyValueStorage>,
}

impl OAuthFlow {
    /// `pending` should be tab-scoped (session storage) so the nonce
    /// survives the provider redirect but not the tab.
    pub fn new(client: ApiClient, store: AuthStore, pending: Rc<dyn KeyValueStorage>) -> Self {
        Self { client, store, pending }
    }

    /// Fetch the provider URL and remember its `state`. The caller navigates
    /// the window to the returned URL.
    ///
    /// # Errors
    ///
    /// `Api` when the backend call fails, `InvalidAuthUrl` if it returns
    /// something that is not a URL.
    pub async fn begin_google_login(&self) -> Result<String, OAuthError> {
        let resp: OAuthUrlResponse = self.client.get_json(endpoints::OAUTH_GOOGLE_START).await?;
        let url = Url::parse(&resp.auth_url).map_err(|err| OAuthError::InvalidAuthUrl(err.to_string()))?;
        match url.query_pairs().find(|(key, _)| key == "state") {
            Some((_, state)) => self.pending.set_item(OAUTH_STATE_KEY, &state),
            None => log::warn!("[oauth] authorization URL carries no state parameter"),
        }
        Ok(resp.auth_url)
    }

    /// Validate the callback and exchange the code for a session.
    ///
    /// The pending nonce is consumed by the first call that gets as far as
    /// comparing it, so a callback can never be replayed.
    ///
    /// # Errors
    ///
    /// Provider errors, missing parameters, state mismatch, or the backend
    /// exchange failing.
    pub async fn complete_google_login(&self, params: &CallbackParams) -> Result<OAuthLogin, OAuthError> {
        if let Some(error) = &params.error {
            log::warn!("[oauth] provider returned error: {error}");
            return Err(if error == "access_denied" {
                OAuthError::AccessDenied
            } else {
                OAuthError::Provider(error.clone())
            });
        }
        let (Some(code), Some(state)) = (&params.code, &params.state) else {
            return Err(OAuthError::MissingParameters);
        };

        let expected = self.pending.get_item(OAUTH_STATE_KEY);
        self.pending.remove_item(OAUTH_STATE_KEY);
        if expected.as_deref() != Some(state.as_str()) {
            log::error!("[oauth] state mismatch, refusing callback");
            return Err(OAuthError::StateMismatch);
        }

        let resp: OAuthCallbackResponse =
            self.client.get_json(&endpoints::oauth_google_callback(code, state)).await?;
        let user = User { id: resp.user_id, email: resp.email };
        self.store.set_user(Some(user.clone()));
        log::info!("[oauth] signed in (new user: {})", resp.is_new_user);
        Ok(OAuthLogin { user, is_new_user: resp.is_new_user })
    }
}
