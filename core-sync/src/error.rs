use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Scan root unavailable: {path}: {reason}")]
    ScanRootUnavailable { path: PathBuf, reason: String },

    #[error("Remote service unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("Batch {batch} delivery failed after {attempts} attempts: {reason}")]
    BatchDeliveryFailed {
        batch: usize,
        attempts: u32,
        reason: String,
    },

    #[error("None of {failed} updates could be delivered")]
    NothingDelivered { failed: usize },

    #[error("Unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Snapshot store error: {0}")]
    Store(#[from] LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Cycle cancelled")]
    Cancelled,

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
