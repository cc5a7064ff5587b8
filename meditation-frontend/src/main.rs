use anyhow::Context;
use meditation_core::observability::{init_metrics, init_tracing};
use meditation_frontend::config::get_configuration;
use meditation_frontend::services::{ApiClient, IdentityClient};
use meditation_frontend::startup::build_router;
use meditation_frontend::AppState;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "meditation-frontend",
        &configuration.telemetry.log_level,
        configuration.telemetry.otlp_endpoint.as_deref(),
    );
    init_metrics();

    let api = Arc::new(ApiClient::new(configuration.backend.clone()));
    let identity = Arc::new(IdentityClient::new(configuration.identity.clone()));
    let app = build_router(AppState::new(api, identity), &configuration.server);

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to address {}", address))?;

    info!(
        address = %address,
        backend = %configuration.backend.url,
        "Starting meditation-frontend"
    );
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
