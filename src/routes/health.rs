//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::convert::ToolAvailability;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub tools: ToolAvailability,
}

/// GET /health
///
/// Always 200. The `tools` flags come from the startup probe, so the route
/// never starts external processes.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "conversion-gateway",
        tools: state.tool_availability().clone(),
    })
}
