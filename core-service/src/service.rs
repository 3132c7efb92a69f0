//! Agent façade: wires configuration, bridges and the sync pipeline together.

use crate::error::{Result, ServiceError};
use crate::scheduler::Scheduler;
use bridge_desktop::ReqwestHttpClient;
use bridge_traits::http::HttpClient;
use bridge_traits::time::{Clock, SystemClock};
use core_library::{JsonSnapshotStore, SnapshotStore, Track};
use core_metadata::{TagExtractor, TrackExtractor};
use core_runtime::events::EventBus;
use core_runtime::AgentConfig;
use core_sync::{
    Cycle, CycleTrigger, HealthProber, LibraryScanner, ScanOptions, SearchClient, SyncClient,
    SyncEndpoints, SyncPipeline, TrackPayload,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Host-side collaborators of the agent
pub struct AgentDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub snapshot_store: Arc<dyn SnapshotStore>,
    pub clock: Arc<dyn Clock>,
}

impl AgentDependencies {
    /// `reqwest` transport, JSON snapshot at `config.state_path`, system clock.
    pub fn desktop(config: &AgentConfig) -> Result<Self> {
        let http = ReqwestHttpClient::with_timeout(config.network_timeout())
            .map_err(|e| ServiceError::InitializationFailed(e.to_string()))?;

        Ok(Self {
            http_client: Arc::new(http),
            snapshot_store: Arc::new(JsonSnapshotStore::new(&config.state_path)),
            clock: Arc::new(SystemClock),
        })
    }
}

/// Primary façade used by the CLI.
pub struct Music2Db {
    config: AgentConfig,
    extractor: Arc<TagExtractor>,
    pipeline: Arc<SyncPipeline>,
    search: SearchClient,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl Music2Db {
    /// Build the agent with desktop dependencies.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let deps = AgentDependencies::desktop(&config)?;
        Self::with_dependencies(config, deps)
    }

    /// Build the agent around explicit dependencies.
    pub fn with_dependencies(config: AgentConfig, deps: AgentDependencies) -> Result<Self> {
        config.validate()?;

        let remote = &config.remote;
        let timeout = config.network_timeout();
        let extractor = Arc::new(TagExtractor::new().with_hashing(config.hash_contents));

        let prober = HealthProber::new(deps.http_client.clone(), remote.health_url(), timeout)
            .with_expected_status(remote.expected_health_status.clone());

        let scanner = LibraryScanner::new(
            extractor.clone(),
            ScanOptions::new(config.normalized_extensions())
                .with_ignore_markers(config.respect_ignore_markers),
        );

        let endpoints = SyncEndpoints {
            one_track_url: remote.endpoint_url(&remote.one_track_endpoint),
            many_tracks_url: remote.endpoint_url(&remote.many_tracks_endpoint),
            delete_url: remote
                .delete_endpoint
                .as_deref()
                .map(|path| remote.endpoint_url(path)),
        };
        let client = SyncClient::new(deps.http_client.clone(), endpoints, &config.music_root)
            .with_batch_size(config.batch_size)
            .with_retry_policy(config.retry_policy())
            .with_timeout(timeout);

        let search = SearchClient::new(
            deps.http_client,
            remote.endpoint_url(&remote.search_endpoint),
            timeout,
        );

        info!(
            music_root = %config.music_root.display(),
            remote = %remote.base_url(),
            state_path = %config.state_path.display(),
            "Agent configured"
        );

        Ok(Self {
            pipeline: Arc::new(SyncPipeline::new(
                prober,
                scanner,
                deps.snapshot_store,
                client,
            )),
            extractor,
            search,
            clock: deps.clock,
            events: EventBus::default(),
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Scheduler driving this agent's pipeline; `shutdown` stops it.
    pub fn scheduler(&self, shutdown: CancellationToken) -> Result<Scheduler> {
        Ok(Scheduler::new(
            self.pipeline.clone(),
            self.clock.clone(),
            self.events.clone(),
            self.config.scan_time_of_day()?,
            shutdown,
        ))
    }

    /// Run a single cycle outside the scheduler.
    pub async fn run_once(&self, cancel: CancellationToken) -> Cycle {
        self.pipeline.run(CycleTrigger::Manual, cancel).await
    }

    /// Extract one file, without sending it.
    ///
    /// A path reached through the resolved music root is re-expressed under
    /// the configured root, as a scan would report it.
    pub fn extract(&self, path: &Path) -> Result<Track> {
        let mut track = self.extractor.extract(path)?;
        track.path = self.under_music_root(&track.path);
        Ok(track)
    }

    fn under_music_root(&self, path: &Path) -> PathBuf {
        let root = &self.config.music_root;
        if path.starts_with(root) {
            return path.to_path_buf();
        }
        match root.canonicalize() {
            Ok(resolved) => match path.strip_prefix(&resolved) {
                Ok(rest) => root.join(rest),
                Err(_) => path.to_path_buf(),
            },
            Err(_) => path.to_path_buf(),
        }
    }

    /// The payload `track` would be sent as.
    pub fn payload(&self, track: &Track) -> TrackPayload {
        TrackPayload::from_track(track, &self.config.music_root)
    }

    /// Send one track through the one-track endpoint.
    pub async fn send_track(&self, track: &Track) -> Result<Option<String>> {
        Ok(self.pipeline.client().send_one(track).await?)
    }

    pub async fn search(&self, tags: &str, limit: u32) -> Result<Vec<String>> {
        Ok(self.search.search_by_tags(tags, limit).await?)
    }
}
