//! `/healthz`/`/readyz` (spec §1 ambient "additional system-level pieces"),
//! assembling `odata_core::monitoring::SystemHealth` from provider probes
//! without exposing row data.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use odata_core::{HealthCheck, SystemHealth};
use std::time::Instant;

use crate::server::AppState;

/// Liveness: the process is up and serving requests. Never touches the DB.
pub async fn healthz() -> impl IntoResponse {
    let mut health = SystemHealth::default();
    health.add("process", HealthCheck::healthy("running"));
    Json(health)
}

/// Readiness: the configured provider can currently answer a trivial query.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let cancel = tokio_util::sync::CancellationToken::new();
    let probe = odata_sql::BuiltQuery { sql: "SELECT 1".to_string(), args: odata_core::NamedArgs::default() };

    let started = Instant::now();
    let mut health = SystemHealth::default();
    let check = match state.provider.fetch_rows(&probe, &cancel).await {
        Ok(_) => HealthCheck::healthy("provider reachable").with_response_time(started.elapsed()),
        Err(err) => HealthCheck::critical(err.to_string()),
    };
    let status = if check.is_healthy() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    health.add("provider", check);
    (status, Json(health))
}
