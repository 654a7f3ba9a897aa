//! snapcam - single-camera snapshot relay
//!
//! Main entry point.

use snapcam::{
    acquisition::AcquisitionCoordinator,
    poller::{ActivationMode, ActivityPoller, SnapshotActivation},
    snapshot_fetcher::{DirectApiFetcher, OnvifFetcher},
    snapshot_store::SnapshotStore,
    state::{AppConfig, AppState},
    web_api,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snapcam=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting snapcam v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::from_env()?;
    tracing::info!(
        camera = ?config.camera,
        activation_mode = config.activation_mode.as_str(),
        fetch_timeout_ms = config.fetch_timeout_ms,
        snapshot_path = %config.snapshot_path.display(),
        "Configuration loaded"
    );

    let store = Arc::new(SnapshotStore::new(config.snapshot_path.clone()).await);

    // Upstreams
    let direct = Arc::new(DirectApiFetcher::new(
        config.camera.clone(),
        config.fetch_timeout(),
    )?);
    let onvif = Arc::new(OnvifFetcher::connect(&config.camera, config.fetch_timeout()).await?);
    tracing::info!(
        api_url = %config.camera.api_url(),
        onvif_session = onvif.session().is_some(),
        "Upstream fetchers initialized"
    );

    let coordinator = Arc::new(AcquisitionCoordinator::new(direct, onvif, store.clone()));

    let activation = match config.activation_mode {
        ActivationMode::Push => {
            let poller = Arc::new(ActivityPoller::new(
                coordinator.clone(),
                config.poller_config(),
            ));
            poller.start_watchdog().await;
            SnapshotActivation::Push(poller)
        }
        ActivationMode::OnDemand => SnapshotActivation::OnDemand(coordinator.clone()),
    };

    // Create application state
    let state = AppState::new(config, store, coordinator, activation.clone());

    // Create router with static file serving
    let static_dir = state.config.static_dir.clone();
    let serve_dir =
        ServeDir::new(&static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

    let app = web_api::create_router(state.clone())
        .fallback_service(serve_dir)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    tracing::info!(static_dir = %static_dir.display(), "Static file serving enabled");

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    activation.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
