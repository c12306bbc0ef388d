//! Liveness endpoint.

use axum::Json;
use serde::Serialize;
use tabform_telemetry::build_sha;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) build: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        build: build_sha(),
    })
}
