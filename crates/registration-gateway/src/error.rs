//! Error types for the registration gateway.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Gateway error types.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Display name format error: {0}")]
    InvalidFormat(String),

    #[error("Signature error: {0}")]
    InvalidSignature(String),

    #[error("Address already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Address not found: {0}")]
    NotFound(String),

    #[error("Homeserver error: {0}")]
    Homeserver(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Registration budget exhausted, retry in {0}s")]
    RateLimitExceeded(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            GatewayError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS"),
            GatewayError::InvalidFormat(_) => (StatusCode::BAD_REQUEST, "INVALID_FORMAT"),
            GatewayError::InvalidSignature(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
            GatewayError::AlreadyRegistered(_) => (StatusCode::CONFLICT, "ALREADY_REGISTERED"),
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            GatewayError::Homeserver(_) => (StatusCode::BAD_GATEWAY, "HOMESERVER_ERROR"),
            GatewayError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            GatewayError::Encryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ENCRYPTION_ERROR"),
            GatewayError::RateLimitExceeded(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if let GatewayError::RateLimitExceeded(retry_after) = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }
        response
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Storage(format!("JSON serialization error: {}", e))
    }
}

impl From<aes_gcm::Error> for GatewayError {
    fn from(_: aes_gcm::Error) -> Self {
        GatewayError::Encryption("AES-GCM encryption/decryption failed".to_string())
    }
}

impl From<homeserver_client::HomeserverError> for GatewayError {
    fn from(e: homeserver_client::HomeserverError) -> Self {
        GatewayError::Homeserver(e.to_string())
    }
}

impl From<crate::signature::ProofError> for GatewayError {
    fn from(e: crate::signature::ProofError) -> Self {
        use crate::signature::ProofError;
        match e {
            ProofError::Format(msg) => GatewayError::InvalidFormat(msg),
            ProofError::Signature(msg) => GatewayError::InvalidSignature(msg),
        }
    }
}
