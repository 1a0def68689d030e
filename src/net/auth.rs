//! Auth REST handlers that feed the auth store.
//!
//! SYSTEM CONTEXT
//! ==============
//! These are the mutation paths behind the login, register, settings, and
//! logout UI. A successful call writes the store (`set_user`/`clear_user`);
//! the session lifecycle reacts to that transition.
//!
//! ERROR HANDLING
//! ==============
//! Errors are returned to the calling form as `ApiError`; use
//! `ApiError::user_message` for display. Logout is the exception: local
//! state is cleared whatever the server answers, because a failed logout
//! usually means the session is already gone.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::time::Duration;

use super::client::ApiClient;
use super::endpoints;
use super::error::ApiError;
use super::http::ApiRequest;
use super::types::{
    AuthResponse, ChangePasswordRequest, Credentials, DeleteAccountRequest, MessageResponse, UpdateProfileRequest,
    User,
};
use crate::state::auth::AuthStore;

/// Retries allowed for the identity check after the first failure.
pub const CURRENT_USER_MAX_RETRIES: u32 = 3;
const RETRY_BASE_MS: u64 = 1000;
const RETRY_CAP_MS: u64 = 5000;

/// Backoff before retry number `attempt` (0-based): 1s, 2s, 4s, capped at 5s.
pub fn current_user_retry_delay(attempt: u32) -> Duration {
    let ms = RETRY_BASE_MS.saturating_mul(1u64 << attempt.min(16)).min(RETRY_CAP_MS);
    Duration::from_millis(ms)
}

/// Whether a failed identity check should be retried. Auth failures are an
/// answer, not a hiccup.
pub fn should_retry_current_user(failures: u32, err: &ApiError) -> bool {
    failures < CURRENT_USER_MAX_RETRIES && err.is_transient()
}

#[derive(Clone)]
pub struct AuthApi {
    client: ApiClient,
    store: AuthStore,
}

impl AuthApi {
    pub fn new(client: ApiClient, store: AuthStore) -> Self {
        Self { client, store }
    }

    /// `POST /auth/login`.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` from the call; the store is left untouched.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.authenticate(endpoints::AUTH_LOGIN, credentials).await
    }

    /// `POST /auth/register`; creates the account and the session.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` from the call; the store is left untouched.
    pub async fn register(&self, credentials: &Credentials) -> Result<User, ApiError> {
        self.authenticate(endpoints::AUTH_REGISTER, credentials).await
    }

    async fn authenticate(&self, path: &str, credentials: &Credentials) -> Result<User, ApiError> {
        let resp: AuthResponse = self.client.send_json(ApiRequest::post(path), Some(credentials)).await?;
        let user = User::from(resp);
        self.store.set_user(Some(user.clone()));
        Ok(user)
    }

    /// `POST /auth/logout`. The store ends anonymous either way.
    ///
    /// # Errors
    ///
    /// Returns the server error for logging; callers treat it as success.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.client.send(ApiRequest::post(endpoints::AUTH_LOGOUT)).await;
        self.store.clear_user();
        if let Err(err) = &result {
            log::warn!("[auth] logout failed server-side, cleared locally: {err}");
        }
        result.map(|_| ())
    }

    /// Restore identity after a reload via `GET /auth/me`.
    ///
    /// Only runs while the persisted snapshot claims a session; returns
    /// `Ok(None)` without a request otherwise. Transient failures are retried
    /// with backoff; the final outcome is written to the store.
    ///
    /// # Errors
    ///
    /// Returns the last `ApiError` after the store has been cleared.
    pub async fn fetch_current_user(&self) -> Result<Option<User>, ApiError> {
        if !self.store.is_authenticated() {
            return Ok(None);
        }
        let runtime = self.client.runtime();
        let mut failures = 0;
        loop {
            match self.client.get_json::<AuthResponse>(endpoints::AUTH_ME).await {
                Ok(resp) => {
                    let user = User::from(resp);
                    self.store.set_user(Some(user.clone()));
                    return Ok(Some(user));
                }
                Err(err) if should_retry_current_user(failures, &err) => {
                    log::warn!("[auth] identity check failed ({err}), retry {}", failures + 1);
                    runtime.sleep(current_user_retry_delay(failures)).await;
                    failures += 1;
                }
                Err(err) => {
                    self.store.set_user(None);
                    return Err(err);
                }
            }
        }
    }

    /// `PUT /auth/profile`; the store picks up the new email.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` from the call.
    pub async fn update_profile(&self, email: &str) -> Result<User, ApiError> {
        let body = UpdateProfileRequest { email: email.to_owned() };
        let resp: AuthResponse = self.client.send_json(ApiRequest::put(endpoints::AUTH_PROFILE), Some(&body)).await?;
        let user = User::from(resp);
        self.store.set_user(Some(user.clone()));
        Ok(user)
    }

    /// `PUT /auth/password`.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` from the call.
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<String, ApiError> {
        let body = ChangePasswordRequest {
            current_password: current_password.to_owned(),
            new_password: new_password.to_owned(),
        };
        let resp: MessageResponse =
            self.client.send_json(ApiRequest::put(endpoints::AUTH_PASSWORD), Some(&body)).await?;
        Ok(resp.message)
    }

    /// `DELETE /auth/account`; clears the store on success.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` from the call; the store is kept on failure.
    pub async fn delete_account(&self, password: &str) -> Result<String, ApiError> {
        let body = DeleteAccountRequest { password: password.to_owned() };
        let resp: MessageResponse =
            self.client.send_json(ApiRequest::delete(endpoints::AUTH_ACCOUNT), Some(&body)).await?;
        self.store.clear_user();
        Ok(resp.message)
    }

    /// `GET /auth/export`: everything the backend stores about the user.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` from the call.
    pub async fn export_user_data(&self) -> Result<serde_json::Value, ApiError> {
        self.client.get_json(endpoints::AUTH_EXPORT).await
    }
}
