//! Wire DTOs for the backend REST API.
//!
//! DESIGN
//! ======
//! Field names follow the backend's camelCase JSON. Only the fields the
//! client reads are modeled; unknown fields are ignored.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// Identity held in the auth store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
}

/// Reply from login, register, me, and profile update.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<AuthResponse> for User {
    fn from(resp: AuthResponse) -> Self {
        Self { id: resp.id, email: resp.email }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Heartbeat reply: remaining session lifetime in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub expires_in: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthUrlResponse {
    pub auth_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCallbackResponse {
    pub user_id: i64,
    pub email: String,
    #[serde(default)]
    pub is_new_user: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateProfileRequest {
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// One row of the favorites list.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStats {
    pub favorite_id: i64,
    pub ticker: String,
    pub company_name: String,
    pub sector: Option<String>,
    pub exchange: Option<String>,
    pub ai_news_count: u32,
    pub user_news_count: u32,
    pub created_at: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCheck {
    pub is_favorite: bool,
}
