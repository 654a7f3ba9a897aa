//! Shared response models
//!
//! Types returned by more than one handler live here so `web_api` does not
//! depend on handler internals.

use crate::acquisition::AcquisitionStats;
use crate::poller::{ActivationMode, PollerStatus};
use crate::snapshot_store::StoreStatus;
use serde::Serialize;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub onvif_session: bool,
}

/// Diagnostics for /debug
#[derive(Debug, Clone, Serialize)]
pub struct DebugResponse {
    pub mode: ActivationMode,
    pub store: StoreStatus,
    /// Absent in on-demand mode
    pub poller: Option<PollerStatus>,
    pub acquisition: AcquisitionStats,
    pub onvif_session: bool,
}
