//! Domain models for the music library
//!
//! A `Track` is created fresh by every scan and never mutated afterwards; the
//! `Fingerprint` it carries is what change detection compares.

use crate::error::LibraryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// =============================================================================
// Track Format
// =============================================================================

/// Container/tag family a track was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackFormat {
    Mp3,
    Flac,
    M4a,
    Ogg,
}

impl TrackFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackFormat::Mp3 => "mp3",
            TrackFormat::Flac => "flac",
            TrackFormat::M4a => "m4a",
            TrackFormat::Ogg => "ogg",
        }
    }
}

impl fmt::Display for TrackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackFormat {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp3" => Ok(TrackFormat::Mp3),
            "flac" => Ok(TrackFormat::Flac),
            "m4a" => Ok(TrackFormat::M4a),
            "ogg" => Ok(TrackFormat::Ogg),
            other => Err(LibraryError::InvalidInput {
                field: "format".to_string(),
                message: format!("unknown track format '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Fingerprint
// =============================================================================

/// File identity used for change detection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Fingerprint {
    /// File size in bytes
    pub file_size_bytes: u64,
    /// Modification time, unix seconds
    pub modified: i64,
    /// Hex SHA-256 of the file contents; empty when hashing is disabled
    #[serde(default)]
    pub content_hash: String,
}

impl Fingerprint {
    pub fn new(file_size_bytes: u64, modified: i64) -> Self {
        Self {
            file_size_bytes,
            modified,
            content_hash: String::new(),
        }
    }

    pub fn with_hash(mut self, content_hash: impl Into<String>) -> Self {
        self.content_hash = content_hash.into();
        self
    }

    pub fn has_hash(&self) -> bool {
        !self.content_hash.is_empty()
    }

    /// Whether two observations describe the same content.
    ///
    /// Hashes decide when both sides have one, so a touch without a content
    /// change is not a modification. Otherwise `(modified, size)` decides.
    pub fn matches(&self, other: &Fingerprint) -> bool {
        if self.has_hash() && other.has_hash() {
            self.content_hash == other.content_hash
        } else {
            self.modified == other.modified && self.file_size_bytes == other.file_size_bytes
        }
    }
}

// =============================================================================
// Track
// =============================================================================

/// One audio file's normalized metadata.
///
/// Optional metadata is represented by empty strings and zeros so that the
/// wire payload never carries nulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Absolute path; identity key within a snapshot
    pub path: PathBuf,

    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    /// Track position on album, `0` when unknown
    pub track_number: u32,
    /// Release year, `0` when unknown
    pub year: u32,
    pub genre: String,
    /// Free-form tag string from `LastFM tags:` comments
    pub tags: String,
    /// Whole seconds, truncated
    pub duration_seconds: u64,
    pub format: TrackFormat,

    #[serde(flatten)]
    pub fingerprint: Fingerprint,
}

impl Track {
    /// Create a track with empty metadata.
    pub fn new(path: impl Into<PathBuf>, format: TrackFormat, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            album_artist: String::new(),
            track_number: 0,
            year: 0,
            genre: String::new(),
            tags: String::new(),
            duration_seconds: 0,
            format,
            fingerprint,
        }
    }

    /// `/`-separated path relative to `root`, or the full path when the track
    /// lives outside it.
    pub fn relative_path(&self, root: &Path) -> String {
        relative_path(&self.path, root)
    }

    /// Validate track data
    pub fn validate(&self) -> Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("Track path cannot be empty".to_string());
        }

        if !self.path.is_absolute() {
            return Err(format!(
                "Track path {} must be absolute",
                self.path.display()
            ));
        }

        Ok(())
    }
}

/// `/`-separated form of `path` relative to `root`; the full path when
/// `path` is outside `root`.
pub fn relative_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}
