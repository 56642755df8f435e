use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::server::app::AxumAppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    outcome_store: &'static str,
}

/// Health check endpoint
///
/// Liveness only; the process has no mandatory backing service.
pub async fn health_handler(Extension(state): Extension<AxumAppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        outcome_store: state.outcome_backend,
    })
}
