//! Session keep-alive and its binding to auth state.
//!
//! SYSTEM CONTEXT
//! ==============
//! `heartbeat` slides the server-side session while the user is signed in;
//! `lifecycle` starts and stops it from store transitions and turns expiry
//! into sign-out plus a redirect to `/login`.

pub mod heartbeat;
pub mod lifecycle;
