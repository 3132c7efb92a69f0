//! # Library Model Module
//!
//! Owns the in-memory model of the local music library and its persisted
//! baseline.
//!
//! ## Overview
//!
//! This module manages:
//! - `Track` records and their change `Fingerprint`
//! - `Snapshot`, the path-keyed view of one scan pass
//! - `SnapshotStore`, the load/save seam for the baseline used by the next diff

pub mod error;
pub mod models;
pub mod snapshot;
pub mod store;

pub use error::{LibraryError, Result};
pub use models::{relative_path, Fingerprint, Track, TrackFormat};
pub use snapshot::Snapshot;
pub use store::{JsonSnapshotStore, MemorySnapshotStore, SnapshotStore};
