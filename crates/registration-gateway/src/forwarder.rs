//! Handoff of verified registrations to the homeserver.

use crate::error::GatewayError;
use async_trait::async_trait;
use homeserver_client::{HomeserverClient, RegisterRequest, RegisterResponse};
use tracing::error;

/// Provisions an account on the homeserver.
///
/// Implementations make a single attempt and never retry: account creation
/// has no idempotency key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn forward(&self, request: RegisterRequest) -> Result<RegisterResponse, GatewayError>;
}

#[async_trait]
impl Forwarder for HomeserverClient {
    async fn forward(&self, request: RegisterRequest) -> Result<RegisterResponse, GatewayError> {
        self.register(&request).await.map_err(|e| {
            // No response means the homeserver may still have created the account.
            if e.is_transport() {
                error!(localpart = %request.localpart, error = %e, "Registration outcome unknown");
            }
            e.into()
        })
    }
}
