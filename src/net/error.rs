//! Failure taxonomy for API calls.
//!
//! ERROR HANDLING
//! ==============
//! Network-class failures (`Network`, `Timeout`) never carry a status, so
//! they can not be confused with 401/403. `Status` keeps the backend's own
//! message, when it sent one, for display.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed with status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("invalid JSON payload: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ApiError {
    /// Build a status error, pulling `message` or `error` from a JSON body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .filter(|m| !m.is_empty());
        Self::Status { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// No response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    /// Worth retrying on a read: network-class or server-side failure.
    pub fn is_transient(&self) -> bool {
        self.is_network() || self.status().is_some_and(|s| s >= 500)
    }

    /// Text suitable for showing in a form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message: Some(message), .. } => message.clone(),
            Self::Status { status, message: None } => status_message(*status).to_owned(),
            Self::Network(_) | Self::Timeout(_) | Self::Json(_) => GENERIC_MESSAGE.to_owned(),
        }
    }
}

const GENERIC_MESSAGE: &str = "Ein unbekannter Fehler ist aufgetreten";

fn status_message(status: u16) -> &'static str {
    match status {
        400 => "Ungültige Anfrage",
        401 => "Nicht authentifiziert",
        403 => "Zugriff verweigert",
        404 => "Ressource nicht gefunden",
        500 => "Serverfehler",
        _ => "Ein Fehler ist aufgetreten",
    }
}
