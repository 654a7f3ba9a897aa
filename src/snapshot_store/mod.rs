//! SnapshotStore - Single-slot cache of the latest camera image
//!
//! ## Responsibilities
//!
//! - Hold exactly one JPEG file (the most recent successful acquisition)
//! - Replace it atomically: write a temp file next to it, then rename over it
//! - Report presence / size / mtime for diagnostics
//!
//! Readers never observe a partially written image: a rename either has
//! happened or it has not.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::fs;

/// A single still frame from the camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// JPEG bytes
    pub data: Vec<u8>,
    /// Capture (or last write) time
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Wrap freshly fetched bytes, stamped with the current time
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            captured_at: Utc::now(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Store status for the debug endpoint
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub path: String,
    pub exists: bool,
    pub size_bytes: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// File-backed snapshot store
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store backed by `path`
    ///
    /// The parent directory is created if missing. Failure to create it is
    /// logged and otherwise ignored; the first write will report the problem.
    pub async fn new(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent).await {
                    tracing::debug!(
                        dir = %parent.display(),
                        error = %e,
                        "Could not create snapshot directory, continuing"
                    );
                }
            }
        }

        Self { path }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshot
    ///
    /// Concurrent writers are not ordered; the last rename wins. The write
    /// and rename run on the blocking pool and finish even if the caller is
    /// dropped, so an aborted acquisition never strands a temp file.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let path = self.path.clone();
        let data = snapshot.data.clone();

        tokio::task::spawn_blocking(move || replace_file(&path, &data))
            .await
            .map_err(|e| Error::Internal(format!("Snapshot write task failed: {}", e)))??;

        tracing::debug!(
            path = %self.path.display(),
            size = snapshot.size(),
            "Saved snapshot"
        );

        Ok(())
    }

    /// Read the stored snapshot
    pub async fn read(&self) -> Result<Snapshot> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::StoreUnavailable(
                    "No snapshot has been captured yet".to_string(),
                ));
            }
            Err(e) => {
                return Err(Error::StoreUnavailable(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if data.is_empty() {
            return Err(Error::StoreUnavailable(
                "Stored snapshot is empty".to_string(),
            ));
        }

        let captured_at = fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Snapshot { data, captured_at })
    }

    /// Presence, size and modification time of the snapshot file
    pub async fn status(&self) -> StoreStatus {
        let path = self.path.display().to_string();

        match fs::metadata(&self.path).await {
            Ok(meta) => StoreStatus {
                path,
                exists: true,
                size_bytes: Some(meta.len()),
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            },
            Err(_) => StoreStatus {
                path,
                exists: false,
                size_bytes: None,
                modified_at: None,
            },
        }
    }
}

/// Write `data` to a temp file beside `path`, then rename it over `path`
///
/// Any failure drops the `NamedTempFile`, which deletes it.
fn replace_file(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string())
    );

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| {
            Error::StoreUnavailable(format!(
                "Failed to create temp file in {}: {}",
                dir.display(),
                e
            ))
        })?;

    tmp.write_all(data).map_err(|e| {
        Error::StoreUnavailable(format!(
            "Failed to write {}: {}",
            tmp.path().display(),
            e
        ))
    })?;

    tmp.persist(path).map_err(|e| {
        Error::StoreUnavailable(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;

    Ok(())
}
