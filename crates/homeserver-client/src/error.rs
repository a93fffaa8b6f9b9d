//! Homeserver client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HomeserverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Homeserver did not respond within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Homeserver rejected registration: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid homeserver response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl HomeserverError {
    /// Whether the failure happened before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, HomeserverError::Http(_) | HomeserverError::Timeout(_))
    }
}
