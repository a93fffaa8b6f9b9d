//! API request and response types.

pub use crate::registration::RegistrationRequest;
pub use homeserver_client::RegisterResponse;

use crate::registry::Account;
use serde::Serialize;

/// Public view of a registered account. Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub address: String,
    pub display_name: String,
    pub user_id: String,
    pub registered_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            address: account.address,
            display_name: account.display_name,
            user_id: account.user_id,
            registered_at: account.registered_at.to_rfc3339(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub registry_count: usize,
}
