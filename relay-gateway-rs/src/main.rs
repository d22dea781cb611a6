// relay-gateway-rs/src/main.rs
// Heuristic analysis relay - HTTP entry point
// Port 3000 by default (RELAY_SERVICE_PORT or PORT)

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

use relay_gateway::config::RelayConfig;
use relay_gateway::{build_router, AppState, START_TIME};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let loaded_env = config_rs::load_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    Lazy::force(&START_TIME);

    if loaded_env {
        tracing::debug!("Loaded variables from .env");
    }

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Refusing to start: {}", err);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Backend: {}, model: {}, image detail: {:?}",
        config.backend,
        config.openai.model,
        config.image_detail
    );
    tracing::info!("Poll policy: {}", config.openai.poll);

    let state = Arc::new(AppState::new(config)?);
    let app = build_router(state);

    let addr = config_rs::get_bind_address("relay", 3000);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Relay gateway listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
