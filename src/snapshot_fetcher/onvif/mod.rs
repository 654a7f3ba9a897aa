//! ONVIF snapshot fallback
//!
//! ## Responsibilities
//!
//! - Establish a [`DeviceSession`] once at startup (failure is non-fatal)
//! - Fetch the profile snapshot URI and accept only `image/jpeg`
//!
//! No reconnection: a fetcher built without a session stays without one.

mod session;
mod soap;
mod xml;

pub use session::DeviceSession;

use super::{camera_http_client, CameraEndpoint, FetchError, FetchSource, SnapshotFetcher};
use crate::error::Result;
use crate::snapshot_store::Snapshot;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Fetches snapshots through an ONVIF device session
pub struct OnvifFetcher {
    client: Client,
    session: Option<DeviceSession>,
    username: String,
    password: String,
}

impl OnvifFetcher {
    /// Build the fetcher and try to establish the device session
    ///
    /// Only client construction can fail; a session that cannot be
    /// established is logged and leaves the fetcher permanently unavailable.
    pub async fn connect(endpoint: &CameraEndpoint, timeout: Duration) -> Result<Self> {
        let client = camera_http_client(timeout)?;

        let session = match DeviceSession::connect(&client, endpoint).await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(
                    device_service = %endpoint.device_service_url(),
                    error = %e,
                    "ONVIF session unavailable, continuing with direct API only"
                );
                None
            }
        };

        Ok(Self::new(
            client,
            session,
            &endpoint.username,
            &endpoint.password,
        ))
    }

    /// Create from an already resolved (or absent) session
    pub fn new(
        client: Client,
        session: Option<DeviceSession>,
        username: &str,
        password: &str,
    ) -> Self {
        Self {
            client,
            session,
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn session(&self) -> Option<&DeviceSession> {
        self.session.as_ref()
    }
}

#[async_trait]
impl SnapshotFetcher for OnvifFetcher {
    fn source(&self) -> FetchSource {
        FetchSource::Onvif
    }

    fn is_available(&self) -> bool {
        self.session.is_some()
    }

    async fn fetch(&self) -> std::result::Result<Snapshot, FetchError> {
        let session = self.session.as_ref().ok_or(FetchError::SessionUnavailable)?;

        let resp = self
            .client
            .get(session.snapshot_uri())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamRejected(format!(
                "ONVIF snapshot URI returned {}",
                status
            )));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .unwrap_or_default();

        if content_type != "image/jpeg" {
            return Err(FetchError::UpstreamRejected(format!(
                "ONVIF snapshot has content type '{}'",
                content_type
            )));
        }

        let bytes = resp.bytes().await.map_err(FetchError::transport)?;
        if bytes.is_empty() {
            return Err(FetchError::UpstreamRejected(
                "ONVIF snapshot body is empty".to_string(),
            ));
        }

        tracing::debug!(
            profile_token = %session.profile_token(),
            size = bytes.len(),
            source = "onvif",
            "Snapshot fetched via ONVIF"
        );

        Ok(Snapshot::new(bytes.to_vec()))
    }
}
