//! Client-side state observed by the UI and the session lifecycle.

pub mod auth;
pub mod favorite;
