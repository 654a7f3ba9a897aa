//! API Routes

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::error::{Error, Result};
use crate::models::ApiResponse;
use crate::poller::ActivityPoller;
use crate::state::AppState;
use std::sync::Arc;

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// Create API router
///
/// `/connect` and `/disconnect` exist only when the deployment runs the
/// activity poller.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health & Diagnostics
        .route("/healthz", get(super::health_check))
        .route("/debug", get(super::debug_info))
        // Snapshot
        .route("/snapshot.jpg", get(get_snapshot))
        .route("/snapshot/:name", get(get_named_snapshot));

    if state.activation.poller().is_some() {
        router = router
            .route("/connect", get(client_connect))
            .route("/disconnect", get(client_disconnect));
    }

    router.with_state(state)
}

// ========================================
// Snapshot Handlers
// ========================================

async fn get_snapshot(State(state): State<AppState>) -> Result<Response> {
    state.activation.before_serve().await;

    let snapshot = state.store.read().await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        snapshot.data,
    )
        .into_response())
}

/// `/snapshot/{anything}.jpg`; lets clients bust caches with a unique name
async fn get_named_snapshot(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    match name.strip_suffix(".jpg") {
        Some(stem) if !stem.is_empty() => get_snapshot(State(state)).await,
        _ => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

// ========================================
// Activity Signals
// ========================================

async fn client_connect(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let status = poller(&state)?.client_connected().await;
    Ok(Json(ApiResponse::success(status)))
}

async fn client_disconnect(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let status = poller(&state)?.client_disconnected().await;
    Ok(Json(ApiResponse::success(status)))
}

fn poller(state: &AppState) -> Result<&Arc<ActivityPoller>> {
    state
        .activation
        .poller()
        .ok_or_else(|| Error::Internal("activity signals require push activation".to_string()))
}
