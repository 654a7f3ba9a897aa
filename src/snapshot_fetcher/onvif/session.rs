//! ONVIF device session
//!
//! Established once at startup: GetCapabilities -> media XAddr,
//! GetProfiles -> profile token, GetSnapshotUri -> snapshot URI.

use super::{soap, xml};
use crate::snapshot_fetcher::{CameraEndpoint, FetchError};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

/// Resolved ONVIF media endpoints for one camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    device_service_url: String,
    media_service_url: String,
    profile_token: String,
    snapshot_uri: String,
}

impl DeviceSession {
    /// Open a session against the endpoint's device service
    pub async fn connect(client: &Client, endpoint: &CameraEndpoint) -> Result<Self, FetchError> {
        Self::connect_to(
            client,
            &endpoint.device_service_url(),
            &endpoint.username,
            &endpoint.password,
        )
        .await
    }

    /// Open a session against an explicit device service URL
    pub async fn connect_to(
        client: &Client,
        device_service_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, FetchError> {
        // 1. Media service address
        let capabilities = call(
            client,
            device_service_url,
            username,
            password,
            "GetCapabilities",
            &soap::get_capabilities_body(),
        )
        .await?;

        let media_service_url = xml::section(&capabilities, "Media")
            .and_then(|media| xml::element_text(media, "XAddr"))
            .ok_or_else(|| {
                FetchError::UpstreamRejected("GetCapabilities: no Media XAddr".to_string())
            })?;

        // 2. First media profile
        let profiles = call(
            client,
            &media_service_url,
            username,
            password,
            "GetProfiles",
            &soap::get_profiles_body(),
        )
        .await?;

        let profile_token = xml::element_attribute(&profiles, "Profiles", "token")
            .ok_or_else(|| {
                FetchError::UpstreamRejected("GetProfiles: no profile token".to_string())
            })?;

        // 3. Snapshot URI for that profile
        let snapshot = call(
            client,
            &media_service_url,
            username,
            password,
            "GetSnapshotUri",
            &soap::get_snapshot_uri_body(&profile_token),
        )
        .await?;

        let snapshot_uri = xml::section(&snapshot, "MediaUri")
            .and_then(|media_uri| xml::element_text(media_uri, "Uri"))
            .or_else(|| xml::element_text(&snapshot, "Uri"))
            .ok_or_else(|| {
                FetchError::UpstreamRejected("GetSnapshotUri: no Uri".to_string())
            })?;

        tracing::info!(
            device_service = %device_service_url,
            media_service = %media_service_url,
            profile_token = %profile_token,
            "ONVIF device session established"
        );

        Ok(Self {
            device_service_url: device_service_url.to_string(),
            media_service_url,
            profile_token,
            snapshot_uri,
        })
    }

    pub fn device_service_url(&self) -> &str {
        &self.device_service_url
    }

    pub fn media_service_url(&self) -> &str {
        &self.media_service_url
    }

    pub fn profile_token(&self) -> &str {
        &self.profile_token
    }

    /// HTTP URI that returns a JPEG of the profile's current frame
    pub fn snapshot_uri(&self) -> &str {
        &self.snapshot_uri
    }
}

/// Send one authenticated SOAP request and return the response body
async fn call(
    client: &Client,
    url: &str,
    username: &str,
    password: &str,
    action: &str,
    body: &str,
) -> Result<String, FetchError> {
    tracing::debug!(url = %url, action = %action, "Sending ONVIF request");

    let resp = client
        .post(url)
        .header(CONTENT_TYPE, "application/soap+xml; charset=utf-8")
        .body(soap::envelope(username, password, body))
        .send()
        .await
        .map_err(FetchError::transport)?;

    let status = resp.status();
    let text = resp.text().await.map_err(FetchError::transport)?;

    // Faults usually arrive with 400/500; the fault reason is the useful part
    if let Some(reason) = xml::soap_fault(&text) {
        return Err(FetchError::UpstreamRejected(format!(
            "{} fault: {}",
            action, reason
        )));
    }

    if !status.is_success() {
        return Err(FetchError::UpstreamRejected(format!(
            "{} returned {}",
            action, status
        )));
    }

    Ok(text)
}
