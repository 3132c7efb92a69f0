use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::SystemClock;
use core_library::{MemorySnapshotStore, SnapshotStore};
use core_runtime::events::{CoreEvent, CycleEvent};
use core_runtime::AgentConfig;
use core_service::{AgentDependencies, Music2Db, ServiceError, TriggerOutcome};
use core_sync::{CycleState, CycleTrigger};
use mockall::mock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

fn config(root: &std::path::Path) -> AgentConfig {
    AgentConfig::builder()
        .music_root(root)
        .base_url("http://catalog")
        .port(8080)
        .state_path(root.join("state.json"))
        .build()
        .unwrap()
}

fn healthy_remote() -> MockHttpClient {
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|req| req.method == HttpMethod::Get && req.url == "http://catalog:8080/health/")
        .returning(|_| Ok(HttpResponse::new(200, r#"{"status": "Server is running"}"#)));
    http
}

fn agent(
    root: &std::path::Path,
    http: MockHttpClient,
    store: Arc<MemorySnapshotStore>,
) -> Music2Db {
    let snapshot_store: Arc<dyn SnapshotStore> = store;
    Music2Db::with_dependencies(
        config(root),
        AgentDependencies {
            http_client: Arc::new(http),
            snapshot_store,
            clock: Arc::new(SystemClock),
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_run_once_on_empty_library_persists_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemorySnapshotStore::new());
    let agent = agent(dir.path(), healthy_remote(), store.clone());

    let cycle = agent.run_once(CancellationToken::new()).await;

    assert_eq!(cycle.state, CycleState::Succeeded);
    assert_eq!(cycle.counts.added, 0);
    assert_eq!(store.save_count().await, 1);
}

#[tokio::test]
async fn test_scheduler_trigger_publishes_events() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemorySnapshotStore::new());
    let agent = agent(dir.path(), healthy_remote(), store);
    let mut events = agent.events().subscribe();

    let scheduler = agent.scheduler(CancellationToken::new()).unwrap();
    let outcome = scheduler.trigger(CycleTrigger::Manual).await;
    assert!(matches!(outcome, TriggerOutcome::Completed(_)));

    let CoreEvent::Cycle(started) = events.recv().await.unwrap();
    assert!(matches!(started, CycleEvent::Started { ref trigger, .. } if trigger == "manual"));

    let CoreEvent::Cycle(completed) = events.recv().await.unwrap();
    match completed {
        CycleEvent::Completed { outcome, .. } => assert_eq!(outcome, "succeeded"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_search_uses_configured_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|req| req.url == "http://catalog:8080/search_tracks/?tags=jazz&limit=2")
        .times(1)
        .returning(|_| Ok(HttpResponse::new(200, r#"["a.mp3"]"#)));

    let agent = agent(dir.path(), http, Arc::new(MemorySnapshotStore::new()));
    let paths = agent.search("jazz", 2).await.unwrap();
    assert_eq!(paths, vec!["a.mp3".to_string()]);
}

#[tokio::test]
async fn test_extract_rejects_unsupported_file() {
    let dir = tempfile::tempdir().unwrap();
    let cover = dir.path().join("cover.jpg");
    std::fs::write(&cover, b"jpg").unwrap();

    let agent = agent(
        dir.path(),
        MockHttpClient::new(),
        Arc::new(MemorySnapshotStore::new()),
    );
    assert!(matches!(
        agent.extract(&cover),
        Err(ServiceError::Metadata(_))
    ));
}

/// `fLaC` marker and a lone STREAMINFO block for one second of mono audio.
fn bare_flac() -> Vec<u8> {
    let mut out = b"fLaC".to_vec();
    out.push(0x80);
    out.extend_from_slice(&[0x00, 0x00, 0x22]);
    out.extend_from_slice(&4096u16.to_be_bytes());
    out.extend_from_slice(&4096u16.to_be_bytes());
    out.extend_from_slice(&[0; 6]);
    let packed: u64 = (44_100 << 44) | (15 << 36) | 44_100;
    out.extend_from_slice(&packed.to_be_bytes());
    out.extend_from_slice(&[0u8; 16]);
    out
}

#[cfg(unix)]
#[tokio::test]
async fn test_extract_reroots_paths_under_symlinked_music_root() {
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("real");
    std::fs::create_dir_all(real.join("Album")).unwrap();
    std::fs::write(real.join("Album/song.flac"), bare_flac()).unwrap();
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let agent = agent(
        &link,
        MockHttpClient::new(),
        Arc::new(MemorySnapshotStore::new()),
    );
    let resolved = link.join("Album/song.flac").canonicalize().unwrap();
    let track = agent.extract(&resolved).unwrap();

    assert_eq!(track.path, link.join("Album/song.flac"));
    assert_eq!(agent.payload(&track).path, "Album/song.flac");
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = AgentConfig::default();
    config.music_root = "/music".into();
    config.batch_size = 0;

    let result = Music2Db::with_dependencies(
        config,
        AgentDependencies {
            http_client: Arc::new(MockHttpClient::new()),
            snapshot_store: Arc::new(MemorySnapshotStore::new()),
            clock: Arc::new(SystemClock),
        },
    );
    assert!(matches!(result, Err(ServiceError::Config(_))));
}
