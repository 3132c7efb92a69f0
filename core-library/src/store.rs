//! Snapshot persistence
//!
//! The baseline snapshot is passed around explicitly as a `SnapshotStore`.
//! `JsonSnapshotStore` keeps it in a single JSON document and replaces that
//! document atomically: the new content is written and synced to a sibling
//! temp file which is then renamed over the target.

use crate::error::{LibraryError, Result};
use crate::models::Track;
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Current on-disk document version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Load/save seam for the persisted baseline.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot; `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the saved snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    saved_at: DateTime<Utc>,
    tracks: Vec<Track>,
}

// =============================================================================
// JSON file store
// =============================================================================

/// Stores the snapshot as `{version, saved_at, tracks}` JSON.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved snapshot");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let document: SnapshotDocument = serde_json::from_slice(&bytes)?;
        if document.version != SNAPSHOT_VERSION {
            return Err(LibraryError::UnsupportedVersion {
                found: document.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        for track in &document.tracks {
            track
                .validate()
                .map_err(|message| LibraryError::InvalidInput {
                    field: "tracks".to_string(),
                    message,
                })?;
        }

        debug!(
            path = %self.path.display(),
            tracks = document.tracks.len(),
            saved_at = %document.saved_at,
            "Loaded snapshot"
        );

        Ok(Some(document.tracks.into_iter().collect()))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            tracks: snapshot.tracks().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;

        let temp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        info!(
            path = %self.path.display(),
            tracks = document.tracks.len(),
            "Saved snapshot"
        );
        Ok(())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Snapshot store kept in memory; used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: Option<Snapshot>,
    saves: usize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a baseline.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            inner: Mutex::new(MemoryState {
                snapshot: Some(snapshot),
                saves: 0,
            }),
        }
    }

    /// Number of successful `save` calls so far.
    pub async fn save_count(&self) -> usize {
        self.inner.lock().await.saves
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.inner.lock().await.snapshot.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut state = self.inner.lock().await;
        state.snapshot = Some(snapshot.clone());
        state.saves += 1;
        Ok(())
    }
}
