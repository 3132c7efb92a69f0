//! # Sync Client
//!
//! Delivers an [`UpdateSet`] to the remote catalog.
//!
//! ## Overview
//!
//! - Added and modified tracks are chunked into batches of at most
//!   `batch_size`, each sent as one `POST` of a JSON array
//! - A failed batch (transport error, timeout, non-2xx) is retried with
//!   exponential backoff; once retries run out every path of the batch is
//!   marked failed and the next batch is attempted
//! - A 2xx body may list per-track `results`; those override the batch
//!   outcome for the paths they name
//! - Removed paths go to the delete endpoint when one is configured,
//!   otherwise they are reported as untransmitted
//!
//! Payloads are deterministic and keyed by the track's path relative to the
//! music root. The remote add is an upsert, so re-sending is harmless.

use crate::diff::UpdateSet;
use crate::error::{Result, SyncError};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use core_library::{relative_path, Track, TrackFormat};
use core_runtime::config::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

// =============================================================================
// Wire types
// =============================================================================

/// Flat track map as sent to the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPayload {
    /// `/`-separated, relative to the music root
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub track_number: u32,
    pub year: u32,
    pub genre: String,
    pub tags: String,
    pub duration_seconds: u64,
    pub format: TrackFormat,
}

impl TrackPayload {
    pub fn from_track(track: &Track, music_root: &Path) -> Self {
        Self {
            path: track.relative_path(music_root),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            album_artist: track.album_artist.clone(),
            track_number: track.track_number,
            year: track.year,
            genre: track.genre.clone(),
            tags: track.tags.clone(),
            duration_seconds: track.duration_seconds,
            format: track.format,
        }
    }
}

/// Optional acknowledgement body of a successful add
#[derive(Debug, Default, Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    results: Vec<TrackOutcome>,
}

#[derive(Debug, Deserialize)]
struct TrackOutcome {
    path: String,
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

// =============================================================================
// Report
// =============================================================================

/// What happened to each path of an update set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub succeeded: BTreeSet<PathBuf>,
    pub failed: BTreeSet<PathBuf>,
    /// Removals the remote accepted
    pub removed_acknowledged: BTreeSet<PathBuf>,
    /// Removals whose delete batch failed; retried next cycle
    pub removed_failed: BTreeSet<PathBuf>,
    /// Removals not sent because no delete endpoint is configured
    pub removed_untransmitted: BTreeSet<PathBuf>,
    pub errors: Vec<String>,
    /// Requests that got a 2xx response
    pub batches_delivered: usize,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty() || !self.removed_failed.is_empty()
    }

    /// Whether any update reached the remote
    pub fn delivered_any(&self) -> bool {
        !self.succeeded.is_empty() || !self.removed_acknowledged.is_empty()
    }
}

// =============================================================================
// Client
// =============================================================================

/// Absolute URLs of the catalog endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEndpoints {
    pub one_track_url: String,
    pub many_tracks_url: String,
    pub delete_url: Option<String>,
}

/// Split `tracks` into consecutive batches of at most `batch_size`.
pub fn plan_batches(tracks: &[Track], batch_size: usize) -> Vec<&[Track]> {
    tracks.chunks(batch_size.max(1)).collect()
}

pub struct SyncClient {
    http: Arc<dyn HttpClient>,
    endpoints: SyncEndpoints,
    music_root: PathBuf,
    batch_size: usize,
    retry: RetryPolicy,
    timeout: Duration,
}

impl SyncClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        endpoints: SyncEndpoints,
        music_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            http,
            endpoints,
            music_root: music_root.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn music_root(&self) -> &Path {
        &self.music_root
    }

    /// Deliver every upsert and removal of `updates`.
    ///
    /// Batch failures are recorded in the report, never returned. A
    /// cancellation stops before the next batch and sets `cancelled`.
    #[instrument(
        skip_all,
        fields(upserts = updates.upsert_count(), removals = updates.removed.len())
    )]
    pub async fn sync(&self, updates: &UpdateSet, cancel: &CancellationToken) -> SyncReport {
        let mut report = SyncReport::default();
        let upserts = updates.upserts();
        let batches = plan_batches(&upserts, self.batch_size);
        let total = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                info!(batch = index + 1, total, "Sync cancelled");
                report.cancelled = true;
                return report;
            }
            self.send_batch(index + 1, total, batch, cancel, &mut report)
                .await;
            if report.cancelled {
                return report;
            }
        }

        self.send_removals(&updates.removed, cancel, &mut report)
            .await;

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            removed = report.removed_acknowledged.len(),
            untransmitted = report.removed_untransmitted.len(),
            "Sync finished"
        );
        report
    }

    /// Send a single track through the one-track endpoint.
    ///
    /// Returns the server's acknowledgement message, if any.
    pub async fn send_one(&self, track: &Track) -> Result<Option<String>> {
        let payload = TrackPayload::from_track(track, &self.music_root);
        let request = HttpRequest::new(HttpMethod::Post, &self.endpoints.one_track_url)
            .timeout(self.timeout)
            .json(&payload)?;

        let response = self
            .deliver(request, 1, &CancellationToken::new())
            .await?;
        let ack: Acknowledgement = response.json().unwrap_or_default();
        if let Some(message) = &ack.message {
            info!(path = %payload.path, %message, "Server acknowledged track");
        }
        Ok(ack.message)
    }

    async fn send_batch(
        &self,
        number: usize,
        total: usize,
        batch: &[Track],
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) {
        let payloads: Vec<TrackPayload> = batch
            .iter()
            .map(|track| TrackPayload::from_track(track, &self.music_root))
            .collect();
        debug!(batch = number, total, size = payloads.len(), "Sending batch");

        let request = HttpRequest::new(HttpMethod::Post, &self.endpoints.many_tracks_url)
            .timeout(self.timeout)
            .json(&payloads)
            .map_err(SyncError::from);
        let result = match request {
            Ok(request) => self.deliver(request, number, cancel).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => {
                report.batches_delivered += 1;
                Self::apply_acknowledgement(number, batch, &payloads, &response, report);
            }
            Err(SyncError::Cancelled) => report.cancelled = true,
            Err(e) => {
                warn!(batch = number, total, error = %e, "Batch failed");
                report.errors.push(e.to_string());
                report
                    .failed
                    .extend(batch.iter().map(|track| track.path.clone()));
            }
        }
    }

    fn apply_acknowledgement(
        number: usize,
        batch: &[Track],
        payloads: &[TrackPayload],
        response: &HttpResponse,
        report: &mut SyncReport,
    ) {
        let ack: Acknowledgement = response.json().unwrap_or_default();
        if let Some(message) = &ack.message {
            info!(batch = number, %message, "Server acknowledged batch");
        }

        let outcomes: HashMap<&str, &TrackOutcome> = ack
            .results
            .iter()
            .map(|outcome| (outcome.path.as_str(), outcome))
            .collect();

        for (track, payload) in batch.iter().zip(payloads) {
            match outcomes.get(payload.path.as_str()) {
                Some(outcome) if !outcome.ok => {
                    let reason = outcome.error.as_deref().unwrap_or("rejected by server");
                    warn!(path = %payload.path, reason, "Track rejected");
                    report.errors.push(format!("{}: {}", payload.path, reason));
                    report.failed.insert(track.path.clone());
                }
                _ => {
                    report.succeeded.insert(track.path.clone());
                }
            }
        }
    }

    async fn send_removals(
        &self,
        removed: &[PathBuf],
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) {
        if removed.is_empty() {
            return;
        }

        let Some(delete_url) = &self.endpoints.delete_url else {
            info!(
                count = removed.len(),
                "No delete endpoint configured, removals not transmitted"
            );
            report.removed_untransmitted.extend(removed.iter().cloned());
            return;
        };

        let total = removed.len().div_ceil(self.batch_size);
        for (index, chunk) in removed.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return;
            }

            let paths: Vec<String> = chunk
                .iter()
                .map(|path| relative_path(path, &self.music_root))
                .collect();
            debug!(batch = index + 1, total, size = paths.len(), "Sending removals");

            let request = HttpRequest::new(HttpMethod::Delete, delete_url)
                .timeout(self.timeout)
                .json(&paths)
                .map_err(SyncError::from);
            let result = match request {
                Ok(request) => self.deliver(request, index + 1, cancel).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(_) => {
                    report.batches_delivered += 1;
                    report.removed_acknowledged.extend(chunk.iter().cloned());
                }
                Err(SyncError::Cancelled) => {
                    report.cancelled = true;
                    return;
                }
                Err(e) => {
                    warn!(batch = index + 1, total, error = %e, "Removal batch failed");
                    report.errors.push(format!("removal {}", e));
                    report.removed_failed.extend(chunk.iter().cloned());
                }
            }
        }
    }

    /// Execute `request` until it gets a 2xx or the retry policy runs out.
    async fn deliver(
        &self,
        request: HttpRequest,
        batch: usize,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let attempts = self.retry.total_attempts();
        let mut last_reason = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.retry.delay_for_retry(attempt - 1);
                debug!(batch, attempt, delay_ms = delay.as_millis() as u64, "Backing off");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            match self.http.execute(request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => last_reason = format!("HTTP {}", response.status),
                Err(e) => last_reason = e.to_string(),
            }
            warn!(batch, attempt, attempts, reason = %last_reason, "Delivery attempt failed");
        }

        Err(SyncError::BatchDeliveryFailed {
            batch,
            attempts,
            reason: last_reason,
        })
    }
}
