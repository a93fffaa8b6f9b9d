//! Registration Gateway - Entry point.

use anyhow::{Context, Result};
use homeserver_client::HomeserverClient;
use registration_gateway::{
    api::{create_router, AppState, RegistrationBudget},
    config::{Config, LogFormat},
    registry::{LocalRegistry, Store},
    Registrar, SignatureVerifier,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if let Err(e) = run(config).await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn build_store(config: &Config) -> Result<Store> {
    if !config.registry.persist {
        warn!("Persistence disabled, registrations will be forgotten on restart");
        return Ok(Store::memory());
    }

    let path = config.registry.path.clone();
    Ok(match config.registry.encryption_key()? {
        Some(key) => Store::encrypted(path, key),
        None => {
            warn!("No registry encryption key configured, storing registry as plain JSON");
            Store::file(path)
        }
    })
}

async fn run(config: Config) -> Result<()> {
    info!("Starting Registration Gateway");

    let store = build_store(&config)?;
    info!(kind = store.kind(), path = ?config.registry.path, "Opening registry");

    // Refuse to start on an unreadable registry rather than forget every account.
    let registry = Arc::new(
        LocalRegistry::open(store)
            .await
            .context("Failed to load registry")?,
    );

    let homeserver = HomeserverClient::new(
        &config.homeserver.register_url,
        config.homeserver.as_token.clone(),
        config.homeserver.timeout,
        config.homeserver.max_idle_per_host,
    )
    .context("Failed to create homeserver client")?;

    info!(
        url = %homeserver.register_url(),
        timeout = ?config.homeserver.timeout,
        scheme = ?config.signature.scheme,
        "Forwarding registrations to homeserver"
    );

    let registrar = Registrar::new(
        SignatureVerifier::new(config.signature.scheme),
        registry.clone(),
        Arc::new(homeserver),
    );

    let state = AppState::new(registrar, registry);
    let budget = RegistrationBudget::new(
        config.rate_limit.registrations_per_minute,
        config.rate_limit.burst,
    );
    info!(
        per_minute = config.rate_limit.registrations_per_minute,
        burst = ?config.rate_limit.burst,
        "Registration budget"
    );
    let app = create_router(state, budget);

    let ip = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.listen_addr))?;
    let addr = SocketAddr::new(ip, config.server.port);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
