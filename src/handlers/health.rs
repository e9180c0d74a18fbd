//! Liveness and health endpoints.
//!
//! - `GET /` - plain-text liveness probe, always 200
//! - `GET /health` - JSON status including whether the TMDB credential is set
//!
//! Neither endpoint contacts TMDB.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Liveness probe.
pub async fn liveness() -> &'static str {
    "OK"
}

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "credential_configured": true,
///   "uptime_seconds": 3600,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        credential_configured: state.config.credential_configured(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}
