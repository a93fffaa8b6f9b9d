//! HTTP request handlers.

use super::types::{AccountResponse, HealthResponse, RegisterResponse, RegistrationRequest};
use super::AppState;
use crate::error::GatewayError;
use crate::signature::parse_address;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use tracing::{info, warn};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        registry_count: state.registry.count().await,
    })
}

/// Register an address on the homeserver.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, GatewayError> {
    let Json(request) = payload.map_err(|e| GatewayError::BadRequest(e.body_text()))?;
    info!(localpart = %request.localpart, "Registration request received");

    // Detached from the connection: if the client hangs up mid-flight the
    // forward and the registry write still run to completion.
    let registrar = state.registrar.clone();
    let outcome = tokio::spawn(async move { registrar.register(request).await })
        .await
        .map_err(|e| GatewayError::Internal(format!("Registration task failed: {}", e)))?;

    match outcome {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!(error = %e, "Registration rejected");
            Err(e)
        }
    }
}

/// Look up a registered address.
pub async fn get_account(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountResponse>, GatewayError> {
    let parsed = parse_address(&address)?;

    let account = state
        .registry
        .get(&parsed)
        .await
        .ok_or(GatewayError::NotFound(address))?;

    Ok(Json(account.into()))
}
