use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use joss_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Liveness plus a probe of the account store and, when configured, Redis
/// and the blob store.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let mut checks = Vec::with_capacity(3);

    checks.push(match state.accounts.ping().await {
        Ok(()) => HealthCheck::healthy("store"),
        Err(e) => HealthCheck::unhealthy("store", e.to_string()),
    });

    if let Some(result) = state.throttle.ping().await {
        // The throttle fails open, so Redis being down only degrades the service.
        checks.push(match result {
            Ok(()) => HealthCheck::healthy("redis"),
            Err(e) => HealthCheck::degraded("redis", e),
        });
    }

    checks.push(match state.blobs.ping().await {
        Ok(()) => HealthCheck::healthy("blob_store"),
        Err(e) => HealthCheck::degraded("blob_store", e.to_string()),
    });

    let response = HealthResponse::healthy("joss-api", env!("CARGO_PKG_VERSION")).with_checks(checks);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Prometheus text format; 404 when no recorder is installed.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
