//! Application state
//!
//! Holds all shared components and state

use crate::acquisition::AcquisitionCoordinator;
use crate::error::{Error, Result};
use crate::poller::{ActivationMode, PollerConfig, SnapshotActivation};
use crate::snapshot_fetcher::{CameraEndpoint, DEFAULT_API_PATH, DEFAULT_ONVIF_PORT};
use crate::snapshot_store::SnapshotStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Camera to relay
    pub camera: CameraEndpoint,
    /// Upstream request timeout (ms)
    pub fetch_timeout_ms: u64,
    /// Background acquisition period while polling (ms)
    pub poll_interval_ms: u64,
    /// Quiet period after which polling stops (ms)
    pub inactivity_timeout_ms: u64,
    /// Inactivity watchdog period (ms)
    pub inactivity_check_interval_ms: u64,
    /// Push (activity poller) or on-demand acquisition
    pub activation_mode: ActivationMode,
    /// Latest snapshot file
    pub snapshot_path: PathBuf,
    /// Front-end directory served as fallback
    pub static_dir: PathBuf,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
}

impl AppConfig {
    /// Load from process environment (call `dotenvy::dotenv()` first)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |key: &str, default: u64| {
            var(key)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(default)
        };

        let host = var("CAMERA_HOST")
            .ok_or_else(|| Error::Config("CAMERA_HOST is not set".to_string()))?;

        let mut camera = CameraEndpoint::new(
            &host,
            &var("CAMERA_USER").unwrap_or_else(|| "admin".to_string()),
            // Passwords keep surrounding whitespace
            &lookup("CAMERA_PASSWORD").unwrap_or_default(),
        );
        camera.http_port = var("CAMERA_HTTP_PORT").and_then(|p| p.parse().ok());
        camera.onvif_port = var("ONVIF_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_ONVIF_PORT);
        camera.api_path = var("CAMERA_API_PATH").unwrap_or_else(|| DEFAULT_API_PATH.to_string());
        camera.use_tls = var("CAMERA_TLS")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(true);

        let activation_mode = match var("ACTIVATION_MODE") {
            Some(mode) => mode.parse::<ActivationMode>().map_err(Error::Config)?,
            None => ActivationMode::Push,
        };

        Ok(Self {
            camera,
            fetch_timeout_ms: number("FETCH_TIMEOUT_MS", 10000),
            poll_interval_ms: number("POLL_INTERVAL_MS", 5000),
            inactivity_timeout_ms: number("INACTIVITY_TIMEOUT_MS", 30000),
            inactivity_check_interval_ms: number("INACTIVITY_CHECK_INTERVAL_MS", 5000),
            activation_mode,
            snapshot_path: var("SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/snapshot.jpg")),
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./public")),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(3000),
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            inactivity_timeout: Duration::from_millis(self.inactivity_timeout_ms),
            inactivity_check_interval: Duration::from_millis(self.inactivity_check_interval_ms),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// SnapshotStore (latest image)
    pub store: Arc<SnapshotStore>,
    /// AcquisitionCoordinator (direct -> ONVIF)
    pub coordinator: Arc<AcquisitionCoordinator>,
    /// Activation rule run before each snapshot response
    pub activation: SnapshotActivation,
    /// Process start, for uptime
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<SnapshotStore>,
        coordinator: Arc<AcquisitionCoordinator>,
        activation: SnapshotActivation,
    ) -> Self {
        Self {
            config,
            store,
            coordinator,
            activation,
            started_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("CAMERA_HOST", "192.168.1.10")]).unwrap();

        assert_eq!(config.camera.host, "192.168.1.10");
        assert_eq!(config.camera.username, "admin");
        assert_eq!(config.camera.password, "");
        assert_eq!(config.camera.http_port, None);
        assert_eq!(config.camera.onvif_port, 8000);
        assert_eq!(config.camera.api_path, "/cgi-bin/api.cgi");
        assert!(config.camera.use_tls);
        assert_eq!(config.fetch_timeout_ms, 10000);
        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.inactivity_timeout_ms, 30000);
        assert_eq!(config.inactivity_check_interval_ms, 5000);
        assert_eq!(config.activation_mode, ActivationMode::Push);
        assert_eq!(config.snapshot_path, PathBuf::from("./data/snapshot.jpg"));
        assert_eq!(config.static_dir, PathBuf::from("./public"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CAMERA_HOST", "cam.local"),
            ("CAMERA_USER", "viewer"),
            ("CAMERA_PASSWORD", "pw"),
            ("CAMERA_HTTP_PORT", "8443"),
            ("CAMERA_TLS", "false"),
            ("ONVIF_PORT", "2020"),
            ("POLL_INTERVAL_MS", "1000"),
            ("ACTIVATION_MODE", "on_demand"),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(config.camera.username, "viewer");
        assert_eq!(config.camera.password, "pw");
        assert_eq!(config.camera.http_port, Some(8443));
        assert!(!config.camera.use_tls);
        assert_eq!(config.camera.onvif_port, 2020);
        assert_eq!(config.activation_mode, ActivationMode::OnDemand);
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.poller_config().poll_interval,
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = load(&[
            ("CAMERA_HOST", "cam.local"),
            ("POLL_INTERVAL_MS", "soon"),
            ("FETCH_TIMEOUT_MS", "0"),
            ("PORT", "-1"),
        ])
        .unwrap();

        assert_eq!(config.poll_interval_ms, 5000);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_missing_host_is_config_error() {
        assert!(matches!(load(&[]), Err(Error::Config(_))));
        assert!(matches!(
            load(&[("CAMERA_HOST", "  ")]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_unknown_activation_mode_is_config_error() {
        let result = load(&[("CAMERA_HOST", "cam.local"), ("ACTIVATION_MODE", "lazy")]);
        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("lazy")),
            other => panic!("expected Config error, got {:?}", other.map(|c| c.port)),
        }
    }
}
