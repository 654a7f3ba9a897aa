//! WebAPI - HTTP surface
//!
//! ## Responsibilities
//!
//! - Snapshot routes with cache-defeating headers
//! - Connect/disconnect signals for the activity poller
//! - Health and debug endpoints

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::{DebugResponse, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        onvif_session: state.coordinator.has_onvif_session(),
    };

    Json(response)
}

/// Diagnostics: store, poller, last acquisition
pub async fn debug_info(State(state): State<AppState>) -> impl IntoResponse {
    let response = DebugResponse {
        mode: state.activation.mode(),
        store: state.store.status().await,
        poller: state.activation.poller_status().await,
        acquisition: state.coordinator.stats().await,
        onvif_session: state.coordinator.has_onvif_session(),
    };

    Json(response)
}
