//! The registration pipeline.
//!
//! Checks run in a fixed order and exit early:
//! address format, password proof, display-name proof, duplicate check,
//! homeserver handoff, local commit. Nothing touches the registry before the
//! proofs pass and nothing touches the network before the duplicate check.

use crate::error::GatewayError;
use crate::forwarder::Forwarder;
use crate::registry::{hash_secret, registry_key, Account, AccountRegistry, Commit};
use crate::signature::{parse_address, SignatureVerifier};
use homeserver_client::{RegisterRequest, RegisterResponse};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// An inbound registration request.
#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    /// Claimed address, `0x` + 40 hex digits
    pub localpart: String,

    /// `<label>-<signature over localpart>`
    pub displayname: String,

    /// Hex signature over localpart; also the secret that gets hashed
    pub password: SecretString,

    /// Ignored. The gateway derives the hash itself.
    #[serde(default)]
    pub password_hash: Option<String>,
}

/// Runs registrations against a registry and a forwarder.
#[derive(Clone)]
pub struct Registrar {
    verifier: SignatureVerifier,
    registry: Arc<dyn AccountRegistry>,
    forwarder: Arc<dyn Forwarder>,
}

impl Registrar {
    pub fn new(
        verifier: SignatureVerifier,
        registry: Arc<dyn AccountRegistry>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            verifier,
            registry,
            forwarder,
        }
    }

    /// Register one address.
    ///
    /// The returned response is the homeserver's, unmodified. The account is
    /// committed locally only after the homeserver accepted it; once accepted,
    /// the response is returned even if the local snapshot cannot be written.
    #[instrument(skip(self, request), fields(localpart = %request.localpart))]
    pub async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegisterResponse, GatewayError> {
        let RegistrationRequest {
            localpart,
            displayname,
            password,
            ..
        } = request;

        let address = parse_address(&localpart)?;

        let secret = self
            .verifier
            .verify_password(&address, &localpart, password.expose_secret())?;
        drop(password);

        self.verifier
            .verify_display_name(&address, &localpart, &displayname)?;

        if self.registry.exists(&address).await? {
            warn!("Address already registered");
            return Err(GatewayError::AlreadyRegistered(registry_key(&address)));
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_secret(&secret, &address))
            .await
            .map_err(|e| GatewayError::Internal(format!("Hashing task failed: {}", e)))??;

        let response = self
            .forwarder
            .forward(RegisterRequest {
                localpart: localpart.to_lowercase(),
                displayname: displayname.clone(),
                password_hash: password_hash.clone(),
            })
            .await?;

        let commit = self
            .registry
            .create(Account::new(
                &address,
                displayname,
                password_hash,
                response.user_id.clone(),
            ))
            .await?;

        match commit {
            Commit::Durable => info!(user_id = %response.user_id, "Registration accepted"),
            Commit::MemoryOnly(reason) => error!(
                user_id = %response.user_id,
                %reason,
                "Registration accepted but not persisted"
            ),
        }
        Ok(response)
    }
}
