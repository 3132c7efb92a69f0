//! # Sync Pipeline
//!
//! One complete cycle: probe → load baseline → scan → diff → sync → persist.
//!
//! ## Persistence rules
//!
//! - `Failed` and `Cancelled` cycles leave the stored baseline untouched
//! - Otherwise the next baseline is the fresh scan, except that failed
//!   paths keep their previous entry (or stay absent if they were new),
//!   unreadable paths carry their previous entry forward, and removals
//!   whose delete failed are kept so they are retried

use crate::client::{SyncClient, SyncReport};
use crate::diff::diff_excluding;
use crate::error::{Result, SyncError};
use crate::health::{HealthProber, HealthStatus};
use crate::job::{Cycle, CycleState, CycleTrigger};
use crate::scanner::{LibraryScanner, ScanOutcome};
use async_trait::async_trait;
use core_library::{Snapshot, SnapshotStore};
use core_runtime::events::CycleCounts;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{field, info, instrument, warn, Span};

/// Drives an idle cycle to a terminal state.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self, cycle: Cycle, cancel: CancellationToken) -> Cycle;
}

pub struct SyncPipeline {
    prober: HealthProber,
    scanner: LibraryScanner,
    store: Arc<dyn SnapshotStore>,
    client: SyncClient,
    music_root: PathBuf,
}

impl SyncPipeline {
    pub fn new(
        prober: HealthProber,
        scanner: LibraryScanner,
        store: Arc<dyn SnapshotStore>,
        client: SyncClient,
    ) -> Self {
        let music_root = client.music_root().to_path_buf();
        Self {
            prober,
            scanner,
            store,
            client,
            music_root,
        }
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    /// Run a fresh cycle started by `trigger`.
    pub async fn run(&self, trigger: CycleTrigger, cancel: CancellationToken) -> Cycle {
        self.drive(Cycle::new(trigger), cancel).await
    }

    #[instrument(
        skip_all,
        fields(cycle_id = field::Empty, trigger = %cycle.trigger)
    )]
    async fn drive(&self, mut cycle: Cycle, cancel: CancellationToken) -> Cycle {
        Span::current().record("cycle_id", field::display(cycle.id));

        let result = match cycle.start() {
            Ok(()) => self.execute(&mut cycle.counts, &cancel).await,
            Err(e) => Err(e),
        };

        let transition = match result {
            Ok(outcome) => cycle.finish(outcome),
            Err(SyncError::Cancelled) => cycle.cancel(),
            Err(e) => {
                warn!(error = %e, "Cycle failed");
                cycle.fail(e.to_string())
            }
        };
        if let Err(e) = transition {
            warn!(error = %e, "Could not record cycle outcome");
        }

        info!(
            state = %cycle.state,
            scanned = cycle.counts.scanned,
            added = cycle.counts.added,
            modified = cycle.counts.modified,
            removed = cycle.counts.removed,
            synced = cycle.counts.synced,
            failed = cycle.counts.failed,
            unreadable = cycle.counts.unreadable,
            "Cycle finished"
        );
        cycle
    }

    async fn execute(
        &self,
        counts: &mut CycleCounts,
        cancel: &CancellationToken,
    ) -> Result<CycleState> {
        if let HealthStatus::Unreachable { reason } = self.prober.probe().await {
            return Err(SyncError::Unreachable {
                url: self.prober.url().to_string(),
                reason,
            });
        }

        let previous = self.store.load().await?.unwrap_or_default();
        let outcome = self.scanner.scan(&self.music_root, cancel.clone()).await?;
        counts.scanned = outcome.files_seen;
        counts.unreadable = outcome.unreadable.len() as u64;

        let updates = diff_excluding(&previous, &outcome.snapshot, |path| {
            outcome.is_unreadable(path)
        });
        counts.added = updates.added.len() as u64;
        counts.modified = updates.modified.len() as u64;
        counts.removed = updates.removed.len() as u64;
        info!(
            added = counts.added,
            modified = counts.modified,
            removed = counts.removed,
            "Changes detected"
        );

        let report = if updates.is_empty() {
            SyncReport::default()
        } else {
            self.client.sync(&updates, cancel).await
        };
        if report.cancelled || cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        counts.synced = (report.succeeded.len() + report.removed_acknowledged.len()) as u64;
        counts.failed = (report.failed.len() + report.removed_failed.len()) as u64;

        let state = match (report.has_failures(), report.delivered_any()) {
            (false, _) => CycleState::Succeeded,
            (true, true) => CycleState::PartiallyFailed,
            (true, false) => CycleState::Failed,
        };
        if !state.persists_baseline() {
            return Err(SyncError::NothingDelivered {
                failed: counts.failed as usize,
            });
        }

        let next = next_baseline(&previous, &outcome, &report);
        self.store.save(&next).await?;
        Ok(state)
    }
}

#[async_trait]
impl CycleRunner for SyncPipeline {
    async fn run_cycle(&self, cycle: Cycle, cancel: CancellationToken) -> Cycle {
        self.drive(cycle, cancel).await
    }
}

/// Baseline to persist after a cycle that delivered at least partially.
pub fn next_baseline(previous: &Snapshot, outcome: &ScanOutcome, report: &SyncReport) -> Snapshot {
    let mut next = outcome.snapshot.clone();

    for path in &report.failed {
        match previous.get(path) {
            Some(old) => {
                next.insert(old.clone());
            }
            None => {
                next.remove(path);
            }
        }
    }

    for track in previous.tracks() {
        let carried = outcome.is_unreadable(&track.path)
            || report.removed_failed.contains(&track.path);
        if carried && !next.contains(&track.path) {
            next.insert(track.clone());
        }
    }

    next
}
