//! Homeserver registration HTTP client.

use crate::error::HomeserverError;
use crate::types::*;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on idle pooled connections per host.
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 100;

/// Client for the homeserver's application-service registration endpoint.
///
/// Holds one pooled `reqwest::Client` for the lifetime of the process. The
/// service token is a `SecretString` so it never shows up in debug output.
#[derive(Clone)]
pub struct HomeserverClient {
    client: Client,
    register_url: Url,
    as_token: SecretString,
    timeout: Duration,
}

impl HomeserverClient {
    /// Create a new homeserver client.
    pub fn new(
        register_url: &str,
        as_token: SecretString,
        timeout: Duration,
        max_idle_per_host: usize,
    ) -> Result<Self, HomeserverError> {
        let register_url = Url::parse(register_url)
            .map_err(|e| HomeserverError::Config(format!("register URL {}: {}", register_url, e)))?;

        if as_token.expose_secret().is_empty() {
            return Err(HomeserverError::Config("service token is empty".into()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(max_idle_per_host)
            .build()?;

        Ok(Self {
            client,
            register_url,
            as_token,
            timeout,
        })
    }

    /// The configured registration endpoint (without the token).
    pub fn register_url(&self) -> &Url {
        &self.register_url
    }

    /// Register an account on the homeserver.
    ///
    /// Exactly one attempt is made. Account creation carries no idempotency
    /// key, so callers must not retry on failure.
    #[instrument(skip(self, request), fields(localpart = %request.localpart))]
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, HomeserverError> {
        debug!(url = %self.register_url, "Sending registration to homeserver");

        let response = self
            .client
            .post(self.register_url.clone())
            .query(&[("access_token", self.as_token.expose_secret())])
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.handle_response(response).await
    }

    /// Handle HTTP response, converting errors appropriately.
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<RegisterResponse, HomeserverError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.describe())
                .unwrap_or_else(|_| body.chars().take(200).collect());
            warn!(status = %status, message = %message, "Homeserver registration failed");
            return Err(HomeserverError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!("Unparseable homeserver response: {}", e);
            HomeserverError::InvalidResponse(e.to_string())
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> HomeserverError {
        if e.is_timeout() {
            HomeserverError::Timeout(self.timeout)
        } else {
            // reqwest embeds the full URL, token included, in its error text
            HomeserverError::Http(e.without_url())
        }
    }
}
