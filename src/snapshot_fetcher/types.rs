//! Camera endpoint configuration

use std::fmt;

/// Default vendor snapshot API path
pub const DEFAULT_API_PATH: &str = "/cgi-bin/api.cgi";

/// Default ONVIF port
pub const DEFAULT_ONVIF_PORT: u16 = 8000;

/// Immutable description of the camera, built once at startup
#[derive(Clone, PartialEq, Eq)]
pub struct CameraEndpoint {
    /// Hostname or IP address (no scheme, no port)
    pub host: String,
    /// Camera account user name
    pub username: String,
    /// Camera account password
    pub password: String,
    /// Port of the vendor HTTP API (scheme default when None)
    pub http_port: Option<u16>,
    /// ONVIF device service port
    pub onvif_port: u16,
    /// Vendor snapshot API path
    pub api_path: String,
    /// Use https for both upstreams
    pub use_tls: bool,
}

impl CameraEndpoint {
    /// Endpoint with vendor defaults (https, `/cgi-bin/api.cgi`, ONVIF on 8000)
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http_port: None,
            onvif_port: DEFAULT_ONVIF_PORT,
            api_path: DEFAULT_API_PATH.to_string(),
            use_tls: true,
        }
    }

    fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    /// Vendor snapshot API URL, without query string
    pub fn api_url(&self) -> String {
        let path = if self.api_path.starts_with('/') {
            self.api_path.clone()
        } else {
            format!("/{}", self.api_path)
        };

        match self.http_port {
            Some(port) => format!("{}://{}:{}{}", self.scheme(), self.host, port, path),
            None => format!("{}://{}{}", self.scheme(), self.host, path),
        }
    }

    /// ONVIF device service URL
    pub fn device_service_url(&self) -> String {
        format!(
            "{}://{}:{}/onvif/device_service",
            self.scheme(),
            self.host,
            self.onvif_port
        )
    }
}

impl fmt::Debug for CameraEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraEndpoint")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("http_port", &self.http_port)
            .field("onvif_port", &self.onvif_port)
            .field("api_path", &self.api_path)
            .field("use_tls", &self.use_tls)
            .finish()
    }
}
