//! Shared auth UI helpers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Protected routes apply identical unauthenticated redirect behavior, and
//! every sign-in path lands the user on the same page.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use leptos::prelude::*;
use leptos_router::NavigateOptions;

use crate::session::lifecycle::LOGIN_PATH;
use crate::state::auth::AuthSnapshot;

/// Authenticated landing route.
pub const DASHBOARD_PATH: &str = "/dashboard";
/// Frontend route the provider redirects back to; must match the redirect
/// URI registered with Google.
pub const OAUTH_CALLBACK_PATH: &str = "/oauth2/callback/google";
const WELCOME_PATH: &str = "/dashboard?welcome=true";

/// Landing route after a completed sign-in; first-time users get the
/// welcome banner.
pub fn post_login_path(is_new_user: bool) -> &'static str {
    if is_new_user { WELCOME_PATH } else { DASHBOARD_PATH }
}

/// True once the identity check has finished and no user is present.
pub fn should_redirect_unauth(checking: bool, auth: &AuthSnapshot) -> bool {
    !checking && !auth.is_authenticated()
}

/// Redirect to `/login` whenever the identity check is done and no user is
/// present. Uses `replace` so the protected route is not left in history.
pub fn install_unauth_redirect<F>(auth: RwSignal<AuthSnapshot>, checking: RwSignal<bool>, navigate: F)
where
    F: Fn(&str, NavigateOptions) + 'static,
{
    Effect::new(move || {
        if should_redirect_unauth(checking.get(), &auth.get()) {
            navigate(LOGIN_PATH, NavigateOptions { replace: true, ..NavigateOptions::default() });
        }
    });
}
