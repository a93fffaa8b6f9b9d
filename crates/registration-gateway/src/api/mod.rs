//! HTTP API for the registration gateway.

mod budget;
mod handlers;
mod types;

pub use budget::{registration_budget, RegistrationBudget};
pub use handlers::*;
pub use types::*;

use crate::registration::Registrar;
use crate::registry::LocalRegistry;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Registration pipeline
    pub registrar: Arc<Registrar>,
    /// Local account registry (read-only access from handlers)
    pub registry: Arc<LocalRegistry>,
}

impl AppState {
    /// Create new application state.
    pub fn new(registrar: Registrar, registry: Arc<LocalRegistry>) -> Self {
        Self {
            registrar: Arc::new(registrar),
            registry,
        }
    }
}

/// Create the API router. Registrations draw from `budget`; lookups and
/// health checks do not.
pub fn create_router(state: AppState, budget: RegistrationBudget) -> Router {
    let register = post(handlers::register).route_layer(axum_middleware::from_fn_with_state(
        budget,
        registration_budget,
    ));

    Router::new()
        .route("/register", register)
        .route("/v1/accounts/:address", get(handlers::get_account))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
