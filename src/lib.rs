//! snapcam - single-camera snapshot relay
//!
//! ## Architecture
//!
//! 1. SnapshotFetcher - Direct vendor API and ONVIF upstreams
//! 2. SnapshotStore - Latest image on disk, atomic replace
//! 3. AcquisitionCoordinator - Direct -> ONVIF fallback, single write point
//! 4. ActivityPoller - Activity-driven background acquisition
//! 5. WebAPI - Snapshot, signal, health and debug endpoints
//!
//! ## Data Flow
//!
//! request -> activation (poller or on-demand) -> coordinator -> fetchers
//! -> store -> response

pub mod acquisition;
pub mod error;
pub mod models;
pub mod poller;
pub mod snapshot_fetcher;
pub mod snapshot_store;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
