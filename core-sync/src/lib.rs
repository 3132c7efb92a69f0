//! # Library Sync
//!
//! Keeps the remote catalog in step with the local music tree.
//!
//! ## Overview
//!
//! A cycle probes the remote service, loads the persisted baseline, scans
//! the music root, diffs the scan against the baseline and delivers the
//! differences in batches. Whatever was delivered becomes part of the next
//! baseline; whatever failed reappears in the next cycle's diff.
//!
//! ## Components
//!
//! - **Scanner** (`scanner`): Walks the music root and extracts tracks
//! - **Change Detector** (`diff`): Added / modified / removed between snapshots
//! - **Health Prober** (`health`): Pre-flight check of the remote service
//! - **Sync Client** (`client`): Batched, retrying delivery of an update set
//! - **Cycle State Machine** (`job`): Validated lifecycle of one cycle
//! - **Pipeline** (`pipeline`): Runs a whole cycle and persists the baseline
//! - **Search** (`search`): Tag search against the remote catalog

pub mod client;
pub mod diff;
pub mod error;
pub mod health;
pub mod job;
pub mod pipeline;
pub mod scanner;
pub mod search;

pub use client::{plan_batches, SyncClient, SyncEndpoints, SyncReport, TrackPayload};
pub use diff::{diff, diff_excluding, UpdateSet};
pub use error::{Result, SyncError};
pub use health::{HealthProber, HealthStatus};
pub use job::{Cycle, CycleId, CycleState, CycleTrigger};
pub use pipeline::{next_baseline, CycleRunner, SyncPipeline};
pub use scanner::{LibraryScanner, ScanIssue, ScanOptions, ScanOutcome, IGNORE_MARKER};
pub use search::{SearchClient, DEFAULT_SEARCH_LIMIT};
