//! Backend route table, relative to the API prefix.

#[cfg(test)]
#[path = "endpoints_test.rs"]
mod endpoints_test;

pub const AUTH_REGISTER: &str = "/auth/register";
pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_ME: &str = "/auth/me";
pub const AUTH_REFRESH: &str = "/auth/refresh";
pub const AUTH_PROFILE: &str = "/auth/profile";
pub const AUTH_PASSWORD: &str = "/auth/password";
pub const AUTH_ACCOUNT: &str = "/auth/account";
pub const AUTH_EXPORT: &str = "/auth/export";
pub const OAUTH_GOOGLE_START: &str = "/auth/oauth2/google";

pub const FAVORITES: &str = "/favorites";

pub fn oauth_google_callback(code: &str, state: &str) -> String {
    let base = String::from("/auth/oauth2/callback/google?");
    let start = base.len();
    url::form_urlencoded::Serializer::for_suffix(base, start)
        .append_pair("code", code)
        .append_pair("state", state)
        .finish()
}

pub fn favorite(ticker: &str) -> String {
    format!("/favorites/{ticker}")
}

pub fn favorite_check(ticker: &str) -> String {
    format!("/favorites/check/{ticker}")
}
