//! Direct vendor API snapshot
//!
//! `GET {api_url}?cmd=Snap&channel=0&rs={nonce}&user=..&password=..`
//! with the same credentials repeated as HTTP basic auth; the firmware
//! accepts either depending on version.

use super::{
    camera_http_client, is_jpeg, CameraEndpoint, FetchError, FetchSource, SnapshotFetcher,
};
use crate::error::Result;
use crate::snapshot_store::Snapshot;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;

/// Fetches snapshots through the camera's own HTTP API
pub struct DirectApiFetcher {
    client: Client,
    endpoint: CameraEndpoint,
}

impl DirectApiFetcher {
    /// Create new DirectApiFetcher with its own client
    pub fn new(endpoint: CameraEndpoint, timeout: Duration) -> Result<Self> {
        let client = camera_http_client(timeout)?;
        Ok(Self::with_client(endpoint, client))
    }

    /// Create with a caller-provided client
    pub fn with_client(endpoint: CameraEndpoint, client: Client) -> Self {
        Self { client, endpoint }
    }

    /// Cache-busting nonce (current time in ms)
    fn nonce() -> String {
        Utc::now().timestamp_millis().to_string()
    }
}

#[async_trait]
impl SnapshotFetcher for DirectApiFetcher {
    fn source(&self) -> FetchSource {
        FetchSource::Direct
    }

    async fn fetch(&self) -> std::result::Result<Snapshot, FetchError> {
        let url = self.endpoint.api_url();
        let nonce = Self::nonce();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("cmd", "Snap"),
                ("channel", "0"),
                ("rs", nonce.as_str()),
                ("user", self.endpoint.username.as_str()),
                ("password", self.endpoint.password.as_str()),
            ])
            .basic_auth(&self.endpoint.username, Some(&self.endpoint.password))
            .send()
            .await
            .map_err(FetchError::transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamRejected(format!(
                "Snapshot API returned {}",
                status
            )));
        }

        let bytes = resp.bytes().await.map_err(FetchError::transport)?;

        // Firmware answers auth/param errors with 200 + a JSON document
        if !is_jpeg(&bytes) {
            return Err(FetchError::UpstreamRejected(format!(
                "Snapshot API returned non-JPEG body ({} bytes)",
                bytes.len()
            )));
        }

        tracing::debug!(
            host = %self.endpoint.host,
            size = bytes.len(),
            source = "direct",
            "Snapshot fetched via vendor API"
        );

        Ok(Snapshot::new(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot_fetcher::test_support::{
        endpoint_for, expected_basic_auth, spawn_camera, unused_addr, FAKE_JPEG,
    };
    use axum::extract::Query;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;

    async fn snap_handler(
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        let param = |k: &str| query.get(k).map(String::as_str);
        let query_ok = param("cmd") == Some("Snap")
            && param("channel") == Some("0")
            && param("user") == Some("admin")
            && param("password") == Some("secret")
            && param("rs").map(|rs| !rs.is_empty()).unwrap_or(false);
        let auth_ok = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            == Some(expected_basic_auth("admin", "secret").as_str());

        if query_ok && auth_ok {
            ([(header::CONTENT_TYPE, "image/jpeg")], FAKE_JPEG.to_vec()).into_response()
        } else {
            StatusCode::BAD_REQUEST.into_response()
        }
    }

    fn fetcher_for(addr: std::net::SocketAddr, timeout: Duration) -> DirectApiFetcher {
        DirectApiFetcher::new(endpoint_for(addr), timeout).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_sends_query_and_basic_auth() {
        let addr = spawn_camera(Router::new().route("/cgi-bin/api.cgi", get(snap_handler))).await;
        let fetcher = fetcher_for(addr, Duration::from_secs(2));

        let snapshot = fetcher.fetch().await.unwrap();
        assert_eq!(snapshot.data, FAKE_JPEG);
        assert_eq!(fetcher.source(), FetchSource::Direct);
    }

    #[tokio::test]
    async fn test_fetch_unauthorized_is_rejected() {
        let router = Router::new().route(
            "/cgi-bin/api.cgi",
            get(|| async { StatusCode::UNAUTHORIZED }),
        );
        let addr = spawn_camera(router).await;

        let result = fetcher_for(addr, Duration::from_secs(2)).fetch().await;
        assert!(matches!(result, Err(FetchError::UpstreamRejected(_))));
    }

    #[tokio::test]
    async fn test_fetch_json_error_body_is_rejected() {
        let router = Router::new().route(
            "/cgi-bin/api.cgi",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"[{"cmd":"Snap","code":1,"error":{"detail":"please login first"}}]"#,
                )
            }),
        );
        let addr = spawn_camera(router).await;

        let result = fetcher_for(addr, Duration::from_secs(2)).fetch().await;
        assert!(matches!(result, Err(FetchError::UpstreamRejected(_))));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_unreachable() {
        let router = Router::new().route(
            "/cgi-bin/api.cgi",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                FAKE_JPEG.to_vec()
            }),
        );
        let addr = spawn_camera(router).await;

        let result = fetcher_for(addr, Duration::from_millis(100)).fetch().await;
        assert!(matches!(result, Err(FetchError::UpstreamUnreachable(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_unreachable() {
        let addr = unused_addr().await;

        let result = fetcher_for(addr, Duration::from_secs(2)).fetch().await;
        match result {
            Err(FetchError::UpstreamUnreachable(msg)) => {
                assert!(!msg.contains("secret"), "error must not leak credentials: {}", msg);
            }
            other => panic!("expected UpstreamUnreachable, got {:?}", other),
        }
    }
}
