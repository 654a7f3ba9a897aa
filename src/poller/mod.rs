//! ActivityPoller - Activity-driven background acquisition
//!
//! ## Responsibilities
//!
//! - Idle -> Polling on first interested client or on a snapshot request
//! - Recurring acquisition every `poll_interval` while Polling
//! - Polling -> Idle when the last client disconnects or activity stops
//!   for longer than `inactivity_timeout`
//!
//! ## State table
//!
//! | event                     | Idle                           | Polling                         |
//! |---------------------------|--------------------------------|---------------------------------|
//! | connect                   | count+1, start, acquire once   | count+1                         |
//! | disconnect (count 1 -> 0) | -                              | stop                            |
//! | disconnect (count 0)      | no-op                          | no-op                           |
//! | snapshot request          | start, acquire once            | refresh activity, await warm-up |
//! | inactivity check, stale   | -                              | stop, stale clients dropped     |
//!
//! Connects and requests that land while the first acquisition of an
//! activation is still running wait for it, so nobody reads an empty store
//! just because polling has already been switched on.

mod activation;

pub use activation::{ActivationMode, SnapshotActivation};

use crate::acquisition::AcquisitionCoordinator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Poller timing configuration
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Period of background acquisition while Polling
    pub poll_interval: Duration,
    /// Quiet period after which Polling stops
    pub inactivity_timeout: Duration,
    /// Period of the inactivity watchdog
    pub inactivity_check_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            inactivity_timeout: Duration::from_millis(30000),
            inactivity_check_interval: Duration::from_millis(5000),
        }
    }
}

/// Poller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollerState {
    Idle,
    Polling,
}

/// Serializable view of the poller for /debug and /connect responses
#[derive(Debug, Clone, Serialize)]
pub struct PollerStatus {
    pub state: PollerState,
    pub client_count: usize,
    pub last_request_at: Option<DateTime<Utc>>,
    pub polling_since: Option<DateTime<Utc>>,
    pub poll_interval_ms: u64,
    pub inactivity_timeout_ms: u64,
}

struct PollerInner {
    state: PollerState,
    client_count: usize,
    last_activity: Instant,
    last_request_at: Option<DateTime<Utc>>,
    polling_since: Option<DateTime<Utc>>,
    poll_task: Option<JoinHandle<()>>,
    /// Flips to true once the activation's first acquisition has finished
    warmed: Option<watch::Receiver<bool>>,
}

impl PollerInner {
    fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.last_request_at = Some(Utc::now());
    }
}

/// ActivityPoller instance
pub struct ActivityPoller {
    coordinator: Arc<AcquisitionCoordinator>,
    config: PollerConfig,
    inner: Mutex<PollerInner>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl ActivityPoller {
    /// Create new ActivityPoller in Idle
    pub fn new(coordinator: Arc<AcquisitionCoordinator>, config: PollerConfig) -> Self {
        Self {
            coordinator,
            config,
            inner: Mutex::new(PollerInner {
                state: PollerState::Idle,
                client_count: 0,
                last_activity: Instant::now(),
                last_request_at: None,
                polling_since: None,
                poll_task: None,
                warmed: None,
            }),
            watchdog: Mutex::new(None),
        }
    }

    /// Explicit "client connected" signal
    ///
    /// On the 0 -> 1 change while Idle this starts polling. Returns once the
    /// activation's immediate acquisition has finished.
    pub async fn client_connected(&self) -> PollerStatus {
        let warmed = {
            let mut inner = self.inner.lock().await;
            inner.client_count += 1;
            inner.touch();

            tracing::info!(clients = inner.client_count, "Client connected");

            if inner.client_count == 1 {
                self.activate(&mut inner, "client connected");
            }
            inner.warmed.clone()
        };

        wait_warmed(warmed).await;

        self.status().await
    }

    /// Explicit "client disconnected" signal, clamped at zero clients
    pub async fn client_disconnected(&self) -> PollerStatus {
        {
            let mut inner = self.inner.lock().await;

            if inner.client_count == 0 {
                tracing::debug!("Disconnect with no connected clients ignored");
            } else {
                inner.client_count -= 1;
                tracing::info!(clients = inner.client_count, "Client disconnected");

                if inner.client_count == 0 && inner.state == PollerState::Polling {
                    self.deactivate(&mut inner, "all clients disconnected");
                }
            }
        }

        self.status().await
    }

    /// Note a snapshot request; starts polling when Idle
    ///
    /// Returns once the current activation's immediate acquisition has
    /// finished, including one started by a concurrent connect.
    pub async fn record_request(&self) {
        let warmed = {
            let mut inner = self.inner.lock().await;
            inner.touch();
            self.activate(&mut inner, "snapshot requested");
            inner.warmed.clone()
        };

        wait_warmed(warmed).await;
    }

    /// Stop polling if nothing has been requested within the inactivity window
    ///
    /// Clients still counted as connected at that point are treated as gone
    /// (a viewer that stops requesting images without saying goodbye).
    pub async fn check_inactivity(&self) -> PollerState {
        let mut inner = self.inner.lock().await;

        if inner.state == PollerState::Polling
            && inner.last_activity.elapsed() > self.config.inactivity_timeout
        {
            if inner.client_count > 0 {
                tracing::info!(
                    stale_clients = inner.client_count,
                    "Dropping clients that stopped requesting snapshots"
                );
                inner.client_count = 0;
            }
            self.deactivate(&mut inner, "inactivity timeout");
        }

        inner.state
    }

    /// Start the periodic inactivity check
    pub async fn start_watchdog(self: &Arc<Self>) {
        let mut slot = self.watchdog.lock().await;
        if slot.is_some() {
            tracing::warn!("Inactivity watchdog already running");
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.inactivity_check_interval;

        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(poller) = weak.upgrade() else {
                    break;
                };
                poller.check_inactivity().await;
            }
        }));

        tracing::info!(
            check_interval_ms = period.as_millis() as u64,
            inactivity_timeout_ms = self.config.inactivity_timeout.as_millis() as u64,
            "Inactivity watchdog started"
        );
    }

    /// Cancel the poll timer and the watchdog
    pub async fn shutdown(&self) {
        if let Some(handle) = self.watchdog.lock().await.take() {
            handle.abort();
        }

        let mut inner = self.inner.lock().await;
        if inner.state == PollerState::Polling {
            self.deactivate(&mut inner, "shutdown");
        }

        tracing::info!("Activity poller stopped");
    }

    pub async fn state(&self) -> PollerState {
        self.inner.lock().await.state
    }

    pub async fn client_count(&self) -> usize {
        self.inner.lock().await.client_count
    }

    pub async fn status(&self) -> PollerStatus {
        let inner = self.inner.lock().await;
        PollerStatus {
            state: inner.state,
            client_count: inner.client_count,
            last_request_at: inner.last_request_at,
            polling_since: inner.polling_since,
            poll_interval_ms: self.config.poll_interval.as_millis() as u64,
            inactivity_timeout_ms: self.config.inactivity_timeout.as_millis() as u64,
        }
    }

    /// Idle -> Polling; no-op if already polling
    ///
    /// The poll task acquires once immediately and publishes completion on
    /// `warmed`; the recurring runs start one interval after that.
    fn activate(&self, inner: &mut PollerInner, reason: &str) {
        if inner.state == PollerState::Polling {
            return;
        }

        let coordinator = self.coordinator.clone();
        let period = self.config.poll_interval;
        let (warmed_tx, warmed_rx) = watch::channel(false);
        let trigger = reason.to_string();

        inner.poll_task = Some(tokio::spawn(async move {
            if !coordinator.acquire().await {
                tracing::warn!(trigger = %trigger, "Initial acquisition failed");
            }
            warmed_tx.send_replace(true);

            let mut ticker = interval_at(Instant::now() + period, period);
            // The loop awaits each acquisition, so a slow camera delays rather than stacks ticks
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !coordinator.acquire().await {
                    tracing::debug!("Scheduled acquisition failed, retrying next tick");
                }
            }
        }));
        inner.warmed = Some(warmed_rx);
        inner.state = PollerState::Polling;
        inner.polling_since = Some(Utc::now());

        tracing::info!(
            reason = %reason,
            poll_interval_ms = period.as_millis() as u64,
            "Polling started"
        );
    }

    /// Polling -> Idle
    fn deactivate(&self, inner: &mut PollerInner, reason: &str) {
        if let Some(handle) = inner.poll_task.take() {
            handle.abort();
        }
        inner.warmed = None;
        inner.state = PollerState::Idle;
        inner.polling_since = None;

        tracing::info!(reason = %reason, "Polling stopped");
    }
}

/// Wait for an activation's first acquisition; a stopped poller releases
/// waiters by dropping the sender.
async fn wait_warmed(warmed: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = warmed {
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Drop for ActivityPoller {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.get_mut().poll_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.watchdog.get_mut().take() {
            handle.abort();
        }
    }
}
