//! Fake camera helpers for fetcher tests

use super::CameraEndpoint;
use axum::Router;
use base64::Engine;
use std::net::SocketAddr;

/// Smallest thing that passes the JPEG marker check
pub const FAKE_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0xFF, 0xD9,
];

/// Serve `router` on an ephemeral local port
pub async fn spawn_camera(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// A local address nothing is listening on
pub async fn unused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Plain-http endpoint pointing both upstreams at `addr`
pub fn endpoint_for(addr: SocketAddr) -> CameraEndpoint {
    let mut endpoint = CameraEndpoint::new("127.0.0.1", "admin", "secret");
    endpoint.use_tls = false;
    endpoint.http_port = Some(addr.port());
    endpoint.onvif_port = addr.port();
    endpoint
}

pub fn expected_basic_auth(user: &str, password: &str) -> String {
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password))
    )
}
