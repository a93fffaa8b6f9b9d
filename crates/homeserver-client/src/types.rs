//! Request and response types for the homeserver registration endpoint.

use serde::{Deserialize, Serialize};

/// Registration payload sent to the homeserver.
///
/// Carries only the hashed secret; there is no field for a plaintext password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub localpart: String,
    pub displayname: String,
    pub password_hash: String,
}

/// Successful registration response, relayed to the caller as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterResponse {
    pub access_token: String,
    pub home_server: String,
    pub user_id: String,
}

/// Standard homeserver error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub errcode: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Render as `ERRCODE: message`.
    pub fn describe(&self) -> String {
        match &self.error {
            Some(error) => format!("{}: {}", self.errcode, error),
            None => self.errcode.clone(),
        }
    }
}
