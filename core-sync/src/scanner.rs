//! # Library Scanner
//!
//! Walks the music root and turns every allow-listed audio file into a
//! `Track`.
//!
//! ## Overview
//!
//! - Symlinks are never followed; symlinked files are skipped
//! - Directories holding a `.ignore` marker are pruned with their subtree
//! - Per-file extraction failures are logged and excluded; corrupt or
//!   unreadable files are additionally remembered as *unreadable* so the
//!   change detector does not report them as removed
//! - Files whose path is not valid UTF-8 are unreadable too, since neither
//!   the snapshot document nor the catalog can name them
//! - Subdirectories that cannot be listed are unreadable prefixes
//! - Cancellation is checked between files
//!
//! The walk and extraction are blocking; [`LibraryScanner::scan`] runs them
//! on the blocking pool and returns once the whole snapshot is built.

use crate::error::{Result, SyncError};
use core_library::Snapshot;
use core_metadata::TrackExtractor;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

/// Marker file that excludes its directory from scanning
pub const IGNORE_MARKER: &str = ".ignore";

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lowercase extensions without a leading dot
    pub extensions: Vec<String>,
    pub respect_ignore_markers: bool,
}

impl ScanOptions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            respect_ignore_markers: true,
        }
    }

    pub fn with_ignore_markers(mut self, enabled: bool) -> Self {
        self.respect_ignore_markers = enabled;
        self
    }

    fn allows(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .map(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
            .unwrap_or(false)
    }
}

/// A file or directory the scanner could not turn into a track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Result of one complete scan pass
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub snapshot: Snapshot,
    /// Present but unreadable files and directories
    pub unreadable: BTreeSet<PathBuf>,
    pub issues: Vec<ScanIssue>,
    /// Allow-listed files encountered, readable or not
    pub files_seen: u64,
}

impl ScanOutcome {
    /// Whether `path` is, or lies under, something the scan could not read.
    pub fn is_unreadable(&self, path: &Path) -> bool {
        self.unreadable
            .iter()
            .any(|unreadable| path.starts_with(unreadable))
    }
}

#[derive(Clone)]
pub struct LibraryScanner {
    extractor: Arc<dyn TrackExtractor>,
    options: ScanOptions,
}

impl LibraryScanner {
    pub fn new(extractor: Arc<dyn TrackExtractor>, options: ScanOptions) -> Self {
        Self { extractor, options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan `root` on the blocking thread pool.
    pub async fn scan(&self, root: &Path, cancel: CancellationToken) -> Result<ScanOutcome> {
        let scanner = self.clone();
        let root = root.to_path_buf();

        tokio::task::spawn_blocking(move || scanner.scan_blocking(&root, &cancel))
            .await
            .map_err(|e| SyncError::Internal(format!("scan task failed: {}", e)))?
    }

    /// Scan `root` on the current thread.
    #[instrument(skip(self, cancel), fields(root = %root.display()))]
    pub fn scan_blocking(&self, root: &Path, cancel: &CancellationToken) -> Result<ScanOutcome> {
        check_root(root)?;

        let mut outcome = ScanOutcome::default();
        let respect_markers = self.options.respect_ignore_markers;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !(respect_markers && is_ignored_dir(entry)));

        for entry in walker {
            if cancel.is_cancelled() {
                info!("Scan cancelled");
                return Err(SyncError::Cancelled);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.record_walk_error(&mut outcome, e);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                debug!(path = %entry.path().display(), "Skipping symlink");
                continue;
            }
            if !file_type.is_file() || !self.options.allows(entry.path()) {
                continue;
            }

            outcome.files_seen += 1;
            let path = entry.path();
            if path.to_str().is_none() {
                warn!(path = %path.display(), "Skipping file with non UTF-8 path");
                outcome.unreadable.insert(path.to_path_buf());
                outcome.issues.push(ScanIssue {
                    path: path.to_path_buf(),
                    message: "path is not valid UTF-8".to_string(),
                });
                continue;
            }
            match self.extractor.extract(path) {
                Ok(track) => {
                    outcome.snapshot.insert(track);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping file");
                    if e.is_unreadable() {
                        outcome.unreadable.insert(path.to_path_buf());
                    }
                    outcome.issues.push(ScanIssue {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            tracks = outcome.snapshot.len(),
            files_seen = outcome.files_seen,
            unreadable = outcome.unreadable.len(),
            "Scan complete"
        );
        Ok(outcome)
    }

    fn record_walk_error(&self, outcome: &mut ScanOutcome, error: walkdir::Error) {
        let Some(path) = error.path().map(Path::to_path_buf) else {
            warn!(error = %error, "Walk error without a path");
            return;
        };

        let vanished = error
            .io_error()
            .map(|io| io.kind() == std::io::ErrorKind::NotFound)
            .unwrap_or(false);
        if vanished {
            debug!(path = %path.display(), "Entry vanished during scan");
            return;
        }

        warn!(path = %path.display(), error = %error, "Unreadable entry");
        outcome.unreadable.insert(path.clone());
        outcome.issues.push(ScanIssue {
            path,
            message: error.to_string(),
        });
    }
}

fn check_root(root: &Path) -> Result<()> {
    let unavailable = |reason: String| SyncError::ScanRootUnavailable {
        path: root.to_path_buf(),
        reason,
    };

    let metadata = fs::metadata(root).map_err(|e| unavailable(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(unavailable("not a directory".to_string()));
    }
    fs::read_dir(root).map_err(|e| unavailable(e.to_string()))?;
    Ok(())
}

/// Marker check below the root; a marker in the root itself is ignored.
fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.path().join(IGNORE_MARKER).is_file()
}
