use std::path::PathBuf;
use thiserror::Error;

/// Per-file extraction failure.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported format: {path} (extension '{extension}')")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Corrupt metadata in {path}: {reason}")]
    CorruptMetadata { path: PathBuf, reason: String },

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractionError {
    /// Build from an IO error, separating vanished files from unreadable ones.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            ExtractionError::NotFound(path)
        } else {
            ExtractionError::Unreadable { path, source }
        }
    }

    /// The file exists but could not be read this time.
    ///
    /// Such paths keep their previous baseline entry instead of being
    /// reported as removed.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self,
            ExtractionError::CorruptMetadata { .. } | ExtractionError::Unreadable { .. }
        )
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            ExtractionError::UnsupportedFormat { path, .. }
            | ExtractionError::CorruptMetadata { path, .. }
            | ExtractionError::NotFound(path)
            | ExtractionError::Unreadable { path, .. } => path,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractionError>;
