use std::sync::Arc;

use joss_api::config::AppConfig;
use joss_api::{router, AppState, Backends};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    joss_shared::middleware::init_tracing("joss-api", config.is_production());

    let metrics = match joss_shared::middleware::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed");
            None
        }
    };

    let port = config.port;
    let backends = Backends::connect(&config).await?;
    let state = Arc::new(AppState::new(config, backends, metrics)?);

    if !state.google.is_configured() {
        tracing::warn!("google client credentials not set, POST /auth/google will be rejected");
    }

    let app = router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "joss-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("joss-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
