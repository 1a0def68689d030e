//! Favorites REST wrappers.
//!
//! The payloads are opaque to the session core; only the check endpoint's
//! boolean feeds client state (see `state::favorite`).

use super::client::ApiClient;
use super::endpoints;
use super::error::ApiError;
use super::http::ApiRequest;
use super::types::{FavoriteCheck, FavoriteStats};

#[derive(Clone)]
pub struct FavoritesApi {
    client: ApiClient,
}

impl FavoritesApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Favorites with their news counters.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` from the call.
    pub async fn list(&self) -> Result<Vec<FavoriteStats>, ApiError> {
        self.client.get_json(endpoints::FAVORITES).await
    }

    /// # Errors
    ///
    /// Returns the `ApiError` from the call.
    pub async fn check(&self, ticker: &str) -> Result<bool, ApiError> {
        let check: FavoriteCheck = self.client.get_json(&endpoints::favorite_check(ticker)).await?;
        Ok(check.is_favorite)
    }

    /// # Errors
    ///
    /// Returns the `ApiError` from the call.
    pub async fn add(&self, ticker: &str) -> Result<(), ApiError> {
        self.client.send(ApiRequest::post(endpoints::favorite(ticker))).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the `ApiError` from the call.
    pub async fn remove(&self, ticker: &str) -> Result<(), ApiError> {
        self.client.send(ApiRequest::delete(endpoints::favorite(ticker))).await?;
        Ok(())
    }
}
