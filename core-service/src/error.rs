use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] core_metadata::ExtractionError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
