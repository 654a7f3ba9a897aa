//! AcquisitionCoordinator - Fallback chain and single write point
//!
//! ## Responsibilities
//!
//! - Try the direct API first, ONVIF only when it fails
//! - Write the winning image into the SnapshotStore
//! - Reduce every upstream error to a boolean and keep counters for /debug
//!
//! No retries here: cadence belongs to the poller or the next request.

use crate::snapshot_fetcher::{FetchError, FetchSource, SnapshotFetcher};
use crate::snapshot_store::{Snapshot, SnapshotStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Result of one acquisition
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionOutcome {
    pub at: DateTime<Utc>,
    pub success: bool,
    /// Upstream that produced the image (set even if the store write failed)
    pub source: Option<FetchSource>,
    pub size_bytes: Option<usize>,
    pub elapsed_ms: u64,
}

/// Running counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct AcquisitionStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub last: Option<AcquisitionOutcome>,
}

/// AcquisitionCoordinator instance
pub struct AcquisitionCoordinator {
    direct: Arc<dyn SnapshotFetcher>,
    onvif: Arc<dyn SnapshotFetcher>,
    store: Arc<SnapshotStore>,
    stats: RwLock<AcquisitionStats>,
}

impl AcquisitionCoordinator {
    /// Create new AcquisitionCoordinator
    pub fn new(
        direct: Arc<dyn SnapshotFetcher>,
        onvif: Arc<dyn SnapshotFetcher>,
        store: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            direct,
            onvif,
            store,
            stats: RwLock::new(AcquisitionStats::default()),
        }
    }

    /// Run one direct -> ONVIF chain
    ///
    /// Returns true iff an image was fetched and stored. On false the store
    /// is untouched.
    pub async fn acquire(&self) -> bool {
        let started = Instant::now();

        let fetched = match self.try_fetch(&self.direct).await {
            Some(snapshot) => Some((self.direct.source(), snapshot)),
            None => self
                .try_fetch(&self.onvif)
                .await
                .map(|snapshot| (self.onvif.source(), snapshot)),
        };

        let (success, source, size_bytes) = match fetched {
            Some((source, snapshot)) => match self.store.write(&snapshot).await {
                Ok(()) => {
                    tracing::debug!(
                        source = source.as_str(),
                        size = snapshot.size(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Snapshot acquired"
                    );
                    (true, Some(source), Some(snapshot.size()))
                }
                Err(e) => {
                    tracing::error!(
                        source = source.as_str(),
                        error = %e,
                        "Snapshot fetched but could not be stored"
                    );
                    (false, Some(source), Some(snapshot.size()))
                }
            },
            None => {
                tracing::warn!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Snapshot acquisition failed on all upstreams"
                );
                (false, None, None)
            }
        };

        let outcome = AcquisitionOutcome {
            at: Utc::now(),
            success,
            source,
            size_bytes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        let mut stats = self.stats.write().await;
        stats.attempts += 1;
        if success {
            stats.successes += 1;
        } else {
            stats.failures += 1;
        }
        stats.last = Some(outcome);

        success
    }

    /// Fetch from one upstream, logging and swallowing its error
    async fn try_fetch(&self, fetcher: &Arc<dyn SnapshotFetcher>) -> Option<Snapshot> {
        match fetcher.fetch().await {
            Ok(snapshot) => Some(snapshot),
            Err(FetchError::SessionUnavailable) => {
                tracing::debug!(
                    source = fetcher.source().as_str(),
                    "Skipping upstream without session"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    source = fetcher.source().as_str(),
                    error = %e,
                    "Snapshot fetch failed"
                );
                None
            }
        }
    }

    /// Last recorded outcome
    pub async fn last_outcome(&self) -> Option<AcquisitionOutcome> {
        self.stats.read().await.last.clone()
    }

    /// Counters snapshot
    pub async fn stats(&self) -> AcquisitionStats {
        self.stats.read().await.clone()
    }

    /// Whether the ONVIF fallback can be attempted
    pub fn has_onvif_session(&self) -> bool {
        self.onvif.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<FetchSource>>>;

    struct FakeFetcher {
        source: FetchSource,
        result: std::result::Result<Vec<u8>, u16>,
        calls: CallLog,
    }

    #[async_trait]
    impl SnapshotFetcher for FakeFetcher {
        fn source(&self) -> FetchSource {
            self.source
        }

        async fn fetch(&self) -> std::result::Result<Snapshot, FetchError> {
            self.calls.lock().unwrap().push(self.source);
            match &self.result {
                Ok(data) => Ok(Snapshot::new(data.clone())),
                Err(status) => Err(FetchError::UpstreamRejected(format!("HTTP {}", status))),
            }
        }
    }

    fn fake(
        source: FetchSource,
        result: std::result::Result<Vec<u8>, u16>,
        calls: &CallLog,
    ) -> Arc<dyn SnapshotFetcher> {
        Arc::new(FakeFetcher {
            source,
            result,
            calls: calls.clone(),
        })
    }

    async fn coordinator(
        direct: std::result::Result<Vec<u8>, u16>,
        onvif: std::result::Result<Vec<u8>, u16>,
        dir: &tempfile::TempDir,
    ) -> (AcquisitionCoordinator, Arc<SnapshotStore>, CallLog) {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(SnapshotStore::new(dir.path().join("snapshot.jpg")).await);
        let coordinator = AcquisitionCoordinator::new(
            fake(FetchSource::Direct, direct, &calls),
            fake(FetchSource::Onvif, onvif, &calls),
            store.clone(),
        );
        (coordinator, store, calls)
    }

    #[tokio::test]
    async fn test_direct_success_skips_onvif() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, store, calls) =
            coordinator(Ok(vec![0xFF, 0xD8, 1]), Ok(vec![0xFF, 0xD8, 2]), &dir).await;

        assert!(coordinator.acquire().await);
        assert_eq!(*calls.lock().unwrap(), vec![FetchSource::Direct]);
        assert_eq!(store.read().await.unwrap().data, vec![0xFF, 0xD8, 1]);

        let last = coordinator.last_outcome().await.unwrap();
        assert!(last.success);
        assert_eq!(last.source, Some(FetchSource::Direct));
    }

    #[tokio::test]
    async fn test_direct_401_falls_back_to_onvif() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, store, calls) =
            coordinator(Err(401), Ok(vec![0xFF, 0xD8, 2]), &dir).await;

        assert!(coordinator.acquire().await);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![FetchSource::Direct, FetchSource::Onvif]
        );
        assert_eq!(store.read().await.unwrap().data, vec![0xFF, 0xD8, 2]);
        assert_eq!(
            coordinator.last_outcome().await.unwrap().source,
            Some(FetchSource::Onvif)
        );
    }

    #[tokio::test]
    async fn test_both_fail_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, store, calls) = coordinator(Err(500), Err(503), &dir).await;

        store.write(&Snapshot::new(vec![0xFF, 0xD8, 9])).await.unwrap();

        assert!(!coordinator.acquire().await);
        assert_eq!(calls.lock().unwrap().len(), 2);
        assert_eq!(store.read().await.unwrap().data, vec![0xFF, 0xD8, 9]);

        let stats = coordinator.stats().await;
        assert_eq!(stats.attempts, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.successes, 0);
        assert!(stats.last.unwrap().source.is_none());
    }

    #[tokio::test]
    async fn test_both_fail_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, store, _) = coordinator(Err(500), Err(500), &dir).await;

        assert!(!coordinator.acquire().await);
        assert!(store.read().await.is_err());
    }

    #[tokio::test]
    async fn test_store_write_failure_reports_false() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(SnapshotStore::new(blocker.join("snapshot.jpg")).await);
        let coordinator = AcquisitionCoordinator::new(
            fake(FetchSource::Direct, Ok(vec![0xFF, 0xD8, 1]), &calls),
            fake(FetchSource::Onvif, Ok(vec![0xFF, 0xD8, 2]), &calls),
            store,
        );

        assert!(!coordinator.acquire().await);
        // Store failure is not an upstream failure, so ONVIF is not tried
        assert_eq!(*calls.lock().unwrap(), vec![FetchSource::Direct]);
    }

    #[tokio::test]
    async fn test_aborted_acquisition_leaves_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, store, _) =
            coordinator(Ok(vec![0xFF; 16 * 1024 * 1024]), Err(500), &dir).await;
        let coordinator = Arc::new(coordinator);

        for _ in 0..10 {
            let task = {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.acquire().await })
            };
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            task.abort();
            let _ = task.await;
        }

        let leftovers = || -> Vec<String> {
            std::fs::read_dir(dir.path())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .filter(|name| name != "snapshot.jpg")
                .collect()
        };

        // In-flight writes finish on the blocking pool
        for _ in 0..500 {
            if leftovers().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        assert_eq!(leftovers(), Vec::<String>::new());
        assert!(store.status().await.size_bytes.unwrap_or(0) <= 16 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_counters_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _, _) = coordinator(Ok(vec![0xFF, 0xD8, 1]), Err(500), &dir).await;

        for _ in 0..3 {
            assert!(coordinator.acquire().await);
        }

        let stats = coordinator.stats().await;
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.successes, 3);
        assert!(coordinator.has_onvif_session());
    }
}
