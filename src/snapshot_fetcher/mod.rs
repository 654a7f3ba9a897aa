//! SnapshotFetcher - Upstream strategies for obtaining one JPEG frame
//!
//! ## Responsibilities
//!
//! - Direct vendor API call (`cmd=Snap`), preferred for speed
//! - ONVIF media snapshot via an established device session (fallback)
//!
//! Fetchers only return bytes or a [`FetchError`]; persisting the image is
//! the caller's job (see `acquisition`).

mod direct;
mod onvif;
mod types;

#[cfg(test)]
mod test_support;

pub use direct::DirectApiFetcher;
pub use onvif::{DeviceSession, OnvifFetcher};
pub use types::{CameraEndpoint, DEFAULT_API_PATH, DEFAULT_ONVIF_PORT};

use crate::snapshot_store::Snapshot;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Which upstream produced an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    /// Vendor HTTP API (`/cgi-bin/api.cgi?cmd=Snap`)
    Direct,
    /// ONVIF media service snapshot URI
    Onvif,
}

impl FetchSource {
    /// Convert to string for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchSource::Direct => "direct",
            FetchSource::Onvif => "onvif",
        }
    }
}

/// Upstream failure modes
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network error, TLS failure or timeout
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// Camera answered, but not with a usable JPEG (non-2xx, wrong content type, SOAP fault)
    #[error("Upstream rejected: {0}")]
    UpstreamRejected(String),

    /// ONVIF device session was never established
    #[error("ONVIF device session not established")]
    SessionUnavailable,
}

impl FetchError {
    /// Map a transport-level reqwest error, stripping the URL (it carries credentials)
    pub(crate) fn transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::UpstreamUnreachable(format!("timeout: {}", e.without_url()))
        } else {
            FetchError::UpstreamUnreachable(e.without_url().to_string())
        }
    }
}

/// One strategy for pulling a still frame from the camera
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Source tag for logging and outcome tracking
    fn source(&self) -> FetchSource;

    /// Whether this strategy can currently be attempted at all
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch one frame
    async fn fetch(&self) -> Result<Snapshot, FetchError>;
}

/// HTTP client for talking to the camera
///
/// Cameras ship self-signed certificates, so verification is disabled.
pub fn camera_http_client(timeout: Duration) -> crate::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(true)
        .build()?;
    Ok(client)
}

/// JPEG start-of-image marker check
pub fn is_jpeg(data: &[u8]) -> bool {
    data.len() > 2 && data[0] == 0xFF && data[1] == 0xD8
}
