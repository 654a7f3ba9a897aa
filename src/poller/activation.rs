//! Snapshot activation modes
//!
//! One mode per deployment:
//! - `push`: ActivityPoller keeps the cache warm while clients are active
//! - `on_demand`: every snapshot request runs one acquisition first

use super::{ActivityPoller, PollerStatus};
use crate::acquisition::AcquisitionCoordinator;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;

/// Configured activation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    Push,
    OnDemand,
}

impl ActivationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationMode::Push => "push",
            ActivationMode::OnDemand => "on_demand",
        }
    }
}

impl FromStr for ActivationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "push" | "poll" | "polling" => Ok(ActivationMode::Push),
            "on_demand" | "ondemand" => Ok(ActivationMode::OnDemand),
            other => Err(format!(
                "unknown activation mode '{}' (expected push or on_demand)",
                other
            )),
        }
    }
}

/// What a snapshot request does before the store is read
#[derive(Clone)]
pub enum SnapshotActivation {
    /// Refresh activity; wake the poller if idle
    Push(Arc<ActivityPoller>),
    /// Acquire synchronously on every request
    OnDemand(Arc<AcquisitionCoordinator>),
}

impl SnapshotActivation {
    pub fn mode(&self) -> ActivationMode {
        match self {
            SnapshotActivation::Push(_) => ActivationMode::Push,
            SnapshotActivation::OnDemand(_) => ActivationMode::OnDemand,
        }
    }

    /// Run before serving a snapshot request
    pub async fn before_serve(&self) {
        match self {
            SnapshotActivation::Push(poller) => poller.record_request().await,
            SnapshotActivation::OnDemand(coordinator) => {
                if !coordinator.acquire().await {
                    tracing::debug!("On-demand acquisition failed, serving cached snapshot");
                }
            }
        }
    }

    /// The poller, in push mode
    pub fn poller(&self) -> Option<&Arc<ActivityPoller>> {
        match self {
            SnapshotActivation::Push(poller) => Some(poller),
            SnapshotActivation::OnDemand(_) => None,
        }
    }

    pub async fn poller_status(&self) -> Option<PollerStatus> {
        match self.poller() {
            Some(poller) => Some(poller.status().await),
            None => None,
        }
    }

    /// Stop background work (no-op in on-demand mode)
    pub async fn shutdown(&self) {
        if let Some(poller) = self.poller() {
            poller.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_activation_mode() {
        assert_eq!("push".parse::<ActivationMode>(), Ok(ActivationMode::Push));
        assert_eq!(" Push ".parse::<ActivationMode>(), Ok(ActivationMode::Push));
        assert_eq!(
            "on_demand".parse::<ActivationMode>(),
            Ok(ActivationMode::OnDemand)
        );
        assert_eq!(
            "on-demand".parse::<ActivationMode>(),
            Ok(ActivationMode::OnDemand)
        );
        assert!("sometimes".parse::<ActivationMode>().is_err());
    }

    #[test]
    fn test_mode_round_trips_through_as_str() {
        for mode in [ActivationMode::Push, ActivationMode::OnDemand] {
            assert_eq!(mode.as_str().parse::<ActivationMode>(), Ok(mode));
        }
    }
}
