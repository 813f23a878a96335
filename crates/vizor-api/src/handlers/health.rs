//! Liveness endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use vizor_core::Provider;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Configured detection providers.
    pub providers: Vec<Provider>,
    /// Whether video labeling is configured.
    pub video: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        providers: state.providers.configured(),
        video: state.providers.video().is_some(),
    })
}
