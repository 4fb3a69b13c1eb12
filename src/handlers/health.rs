use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "invoice-import-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness probe: checks the active extraction backend is usable.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.extractor.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Extraction backend not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
