//! End-to-end cycle tests against an in-memory catalog.
//!
//! The catalog fake behaves like the real remote: adds are upserts keyed by
//! path, deletes take a JSON array of paths. Audio files are plain text; the
//! extractor uses the file contents as the title. One test runs the real tag
//! extractor over an in-memory MP3.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use core_library::{JsonSnapshotStore, MemorySnapshotStore, SnapshotStore, Track, TrackFormat};
use core_metadata::{read_fingerprint, ExtractionError, TagExtractor, TrackExtractor};
use core_sync::{
    CycleState, CycleTrigger, HealthProber, LibraryScanner, ScanOptions, SyncClient,
    SyncEndpoints, SyncPipeline, TrackPayload, UpdateSet,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Fakes
// =============================================================================

struct ContentExtractor;

impl TrackExtractor for ContentExtractor {
    fn extract(&self, path: &Path) -> core_metadata::Result<Track> {
        let contents = fs::read_to_string(path).map_err(|e| ExtractionError::from_io(path, e))?;
        if contents.starts_with("CORRUPT") {
            return Err(ExtractionError::CorruptMetadata {
                path: path.to_path_buf(),
                reason: "bad header".to_string(),
            });
        }

        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("flac") => TrackFormat::Flac,
            _ => TrackFormat::Mp3,
        };
        let mut track = Track::new(path, format, read_fingerprint(path, true)?);
        track.title = contents.trim().to_string();
        Ok(track)
    }
}

struct FakeCatalog {
    tracks: Mutex<BTreeMap<String, TrackPayload>>,
    add_requests: Mutex<usize>,
    rejected_paths: Mutex<BTreeSet<String>>,
    healthy: AtomicBool,
}

impl FakeCatalog {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            tracks: Mutex::new(BTreeMap::new()),
            add_requests: Mutex::new(0),
            rejected_paths: Mutex::new(BTreeSet::new()),
            healthy: AtomicBool::new(true),
        })
    }

    fn reject(&self, path: &str) {
        self.rejected_paths.lock().unwrap().insert(path.to_string());
    }

    fn accept_all(&self) {
        self.rejected_paths.lock().unwrap().clear();
    }

    fn titles(&self) -> BTreeMap<String, String> {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .map(|(path, payload)| (path.clone(), payload.title.clone()))
            .collect()
    }

    fn add_requests(&self) -> usize {
        *self.add_requests.lock().unwrap()
    }
}

#[async_trait]
impl HttpClient for FakeCatalog {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = request.url.trim_start_matches("http://catalog");
        match (request.method, path) {
            (HttpMethod::Get, "/health/") => {
                if self.healthy.load(Ordering::SeqCst) {
                    Ok(HttpResponse::new(200, r#"{"status": "Server is running"}"#))
                } else {
                    Ok(HttpResponse::new(503, ""))
                }
            }
            (HttpMethod::Post, "/add_tracks/") => {
                *self.add_requests.lock().unwrap() += 1;
                let payloads: Vec<TrackPayload> = request.json_body()?;
                let rejected = self.rejected_paths.lock().unwrap();
                if payloads.iter().any(|p| rejected.contains(&p.path)) {
                    return Ok(HttpResponse::new(503, ""));
                }
                let mut tracks = self.tracks.lock().unwrap();
                for payload in payloads {
                    tracks.insert(payload.path.clone(), payload);
                }
                Ok(HttpResponse::new(200, r#"{"message": "Tracks added"}"#))
            }
            (HttpMethod::Delete, "/delete_tracks/") => {
                let paths: Vec<String> = request.json_body()?;
                let mut tracks = self.tracks.lock().unwrap();
                for path in paths {
                    tracks.remove(&path);
                }
                Ok(HttpResponse::new(204, ""))
            }
            _ => Ok(HttpResponse::new(404, "")),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn sync_client(root: &Path, catalog: &Arc<FakeCatalog>, batch_size: usize) -> SyncClient {
    let http: Arc<dyn HttpClient> = catalog.clone();
    SyncClient::new(
        http,
        SyncEndpoints {
            one_track_url: "http://catalog/add_track/".to_string(),
            many_tracks_url: "http://catalog/add_tracks/".to_string(),
            delete_url: Some("http://catalog/delete_tracks/".to_string()),
        },
        root,
    )
    .with_batch_size(batch_size)
    .with_retry_policy(RetryPolicy::new(
        1,
        Duration::from_millis(1),
        Duration::from_millis(2),
    ))
}

fn pipeline(
    root: &Path,
    catalog: &Arc<FakeCatalog>,
    store: &Arc<MemorySnapshotStore>,
    batch_size: usize,
) -> SyncPipeline {
    let store: Arc<dyn SnapshotStore> = store.clone();
    pipeline_with(root, catalog, store, Arc::new(ContentExtractor), batch_size)
}

fn pipeline_with(
    root: &Path,
    catalog: &Arc<FakeCatalog>,
    store: Arc<dyn SnapshotStore>,
    extractor: Arc<dyn TrackExtractor>,
    batch_size: usize,
) -> SyncPipeline {
    let http: Arc<dyn HttpClient> = catalog.clone();
    SyncPipeline::new(
        HealthProber::new(http, "http://catalog/health/", Duration::from_secs(1))
            .with_expected_status(Some("Server is running".to_string())),
        LibraryScanner::new(extractor, ScanOptions::new(["mp3", "flac"])),
        store,
        sync_client(root, catalog, batch_size),
    )
}

/// ID3v2.4 `TIT2` frame followed by silent 128 kbps MPEG-1 layer III frames.
fn titled_mp3(title: &str) -> Vec<u8> {
    let mut frame = b"TIT2".to_vec();
    let body_len = title.len() as u32 + 1;
    frame.extend_from_slice(&[0, 0, (body_len >> 7) as u8 & 0x7f, body_len as u8 & 0x7f]);
    frame.extend_from_slice(&[0, 0, 0x03]);
    frame.extend_from_slice(title.as_bytes());

    let mut out = b"ID3".to_vec();
    out.extend_from_slice(&[4, 0, 0, 0, 0, (frame.len() >> 7) as u8 & 0x7f, frame.len() as u8 & 0x7f]);
    out.extend(frame);
    for _ in 0..40 {
        let mut audio = vec![0u8; 417];
        audio[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        out.extend(audio);
    }
    out
}

async fn baseline_paths(store: &MemorySnapshotStore) -> Vec<String> {
    store
        .load()
        .await
        .unwrap()
        .unwrap_or_default()
        .paths()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_add_then_modify_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.mp3"), "X").unwrap();
    fs::write(root.join("b.flac"), "B").unwrap();
    fs::write(root.join("cover.jpg"), "jpg").unwrap();

    let catalog = FakeCatalog::new();
    let store = Arc::new(MemorySnapshotStore::new());
    let pipeline = pipeline(root, &catalog, &store, 100);

    let first = pipeline
        .run(CycleTrigger::Startup, CancellationToken::new())
        .await;
    assert_eq!(first.state, CycleState::Succeeded);
    assert_eq!(first.counts.added, 2);
    assert_eq!(first.counts.scanned, 2);
    assert_eq!(
        catalog.titles(),
        BTreeMap::from([
            ("a.mp3".to_string(), "X".to_string()),
            ("b.flac".to_string(), "B".to_string()),
        ])
    );

    fs::write(root.join("a.mp3"), "Y").unwrap();
    fs::remove_file(root.join("b.flac")).unwrap();

    let second = pipeline
        .run(CycleTrigger::Schedule, CancellationToken::new())
        .await;
    assert_eq!(second.state, CycleState::Succeeded);
    assert_eq!(second.counts.added, 0);
    assert_eq!(second.counts.modified, 1);
    assert_eq!(second.counts.removed, 1);
    assert_eq!(
        catalog.titles(),
        BTreeMap::from([("a.mp3".to_string(), "Y".to_string())])
    );
    assert_eq!(baseline_paths(&store).await, vec!["a.mp3"]);

    // Nothing changed: no requests beyond the health probe
    let requests_before = catalog.add_requests();
    let third = pipeline
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;
    assert_eq!(third.state, CycleState::Succeeded);
    assert_eq!(catalog.add_requests(), requests_before);
}

#[tokio::test]
async fn test_retagged_mp3_is_resent_with_new_title() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.mp3"), titled_mp3("X")).unwrap();

    let catalog = FakeCatalog::new();
    let store = Arc::new(MemorySnapshotStore::new());
    let pipeline = pipeline_with(
        root,
        &catalog,
        store.clone(),
        Arc::new(TagExtractor::new()),
        100,
    );

    let first = pipeline
        .run(CycleTrigger::Startup, CancellationToken::new())
        .await;
    assert_eq!(first.state, CycleState::Succeeded);
    assert_eq!(first.counts.added, 1);
    assert_eq!(
        catalog.titles(),
        BTreeMap::from([("a.mp3".to_string(), "X".to_string())])
    );

    // Same size, new content hash
    fs::write(root.join("a.mp3"), titled_mp3("Y")).unwrap();

    let second = pipeline
        .run(CycleTrigger::Schedule, CancellationToken::new())
        .await;
    assert_eq!(second.state, CycleState::Succeeded);
    assert_eq!(second.counts.added, 0);
    assert_eq!(second.counts.modified, 1);
    assert_eq!(
        catalog.titles(),
        BTreeMap::from([("a.mp3".to_string(), "Y".to_string())])
    );
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_non_utf8_file_name_does_not_block_state_file() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempfile::tempdir().unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), "A").unwrap();
    fs::write(dir.path().join(OsStr::from_bytes(b"caf\xe9.mp3")), "B").unwrap();

    let catalog = FakeCatalog::new();
    let json_store = Arc::new(JsonSnapshotStore::new(state_dir.path().join("state.json")));
    let store: Arc<dyn SnapshotStore> = json_store.clone();
    let pipeline = pipeline_with(dir.path(), &catalog, store, Arc::new(ContentExtractor), 10);

    let first = pipeline
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;
    assert_eq!(first.state, CycleState::Succeeded);
    assert_eq!(first.counts.added, 1);
    assert_eq!(first.counts.unreadable, 1);
    assert_eq!(
        catalog.titles(),
        BTreeMap::from([("a.mp3".to_string(), "A".to_string())])
    );

    let saved = json_store.load().await.unwrap().unwrap();
    assert_eq!(saved.len(), 1);

    let second = pipeline
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;
    assert_eq!(second.state, CycleState::Succeeded);
    assert_eq!(second.counts.added, 0);
}

#[tokio::test]
async fn test_resending_an_update_set_creates_no_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), "A").unwrap();
    fs::write(dir.path().join("b.mp3"), "B").unwrap();

    let catalog = FakeCatalog::new();
    let client = sync_client(dir.path(), &catalog, 10);
    let updates = UpdateSet {
        added: vec![
            ContentExtractor.extract(&dir.path().join("a.mp3")).unwrap(),
            ContentExtractor.extract(&dir.path().join("b.mp3")).unwrap(),
        ],
        ..Default::default()
    };

    let cancel = CancellationToken::new();
    let first = client.sync(&updates, &cancel).await;
    let second = client.sync(&updates, &cancel).await;

    assert_eq!(first, second);
    assert_eq!(catalog.titles().len(), 2);
}

#[tokio::test]
async fn test_failed_middle_batch_is_retried_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.mp3", "b.mp3", "c.mp3"] {
        fs::write(dir.path().join(name), name).unwrap();
    }

    let catalog = FakeCatalog::new();
    catalog.reject("b.mp3");
    let store = Arc::new(MemorySnapshotStore::new());
    let pipeline = pipeline(dir.path(), &catalog, &store, 1);

    let first = pipeline
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;
    assert_eq!(first.state, CycleState::PartiallyFailed);
    assert_eq!(first.counts.synced, 2);
    assert_eq!(first.counts.failed, 1);
    assert_eq!(baseline_paths(&store).await, vec!["a.mp3", "c.mp3"]);

    catalog.accept_all();
    let second = pipeline
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;
    assert_eq!(second.state, CycleState::Succeeded);
    assert_eq!(second.counts.added, 1);
    assert_eq!(baseline_paths(&store).await, vec!["a.mp3", "b.mp3", "c.mp3"]);
}

#[tokio::test]
async fn test_unreachable_remote_fails_without_touching_state() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), "A").unwrap();

    let catalog = FakeCatalog::new();
    catalog.healthy.store(false, Ordering::SeqCst);
    let store = Arc::new(MemorySnapshotStore::new());

    let cycle = pipeline(dir.path(), &catalog, &store, 10)
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;

    assert_eq!(cycle.state, CycleState::Failed);
    assert!(cycle.error_message.unwrap().contains("unreachable"));
    assert_eq!(store.save_count().await, 0);
    assert_eq!(catalog.add_requests(), 0);
}

#[tokio::test]
async fn test_every_batch_failing_is_a_failed_cycle() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), "a.mp3").unwrap();

    let catalog = FakeCatalog::new();
    catalog.reject("a.mp3");
    let store = Arc::new(MemorySnapshotStore::new());

    let cycle = pipeline(dir.path(), &catalog, &store, 10)
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;

    assert_eq!(cycle.state, CycleState::Failed);
    assert_eq!(store.save_count().await, 0);
    // One attempt plus one retry
    assert_eq!(catalog.add_requests(), 2);
}

#[tokio::test]
async fn test_unreadable_file_is_not_removed() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), "A").unwrap();
    fs::write(dir.path().join("b.mp3"), "B").unwrap();

    let catalog = FakeCatalog::new();
    let store = Arc::new(MemorySnapshotStore::new());
    let pipeline = pipeline(dir.path(), &catalog, &store, 10);
    pipeline
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;

    fs::write(dir.path().join("b.mp3"), "CORRUPT").unwrap();
    let cycle = pipeline
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;

    assert_eq!(cycle.state, CycleState::Succeeded);
    assert_eq!(cycle.counts.removed, 0);
    assert_eq!(cycle.counts.unreadable, 1);
    assert!(catalog.titles().contains_key("b.mp3"));
    assert_eq!(baseline_paths(&store).await, vec!["a.mp3", "b.mp3"]);
}

#[tokio::test]
async fn test_cancelled_cycle_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.mp3"), "A").unwrap();

    let catalog = FakeCatalog::new();
    let store = Arc::new(MemorySnapshotStore::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let cycle = pipeline(dir.path(), &catalog, &store, 10)
        .run(CycleTrigger::Manual, cancel)
        .await;

    assert_eq!(cycle.state, CycleState::Cancelled);
    assert_eq!(store.save_count().await, 0);
    assert!(catalog.titles().is_empty());
}

#[tokio::test]
async fn test_missing_root_fails_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = FakeCatalog::new();
    let store = Arc::new(MemorySnapshotStore::new());

    let cycle = pipeline(&dir.path().join("missing"), &catalog, &store, 10)
        .run(CycleTrigger::Manual, CancellationToken::new())
        .await;

    assert_eq!(cycle.state, CycleState::Failed);
    assert!(cycle.error_message.unwrap().contains("Scan root unavailable"));
    assert_eq!(store.save_count().await, 0);
}
