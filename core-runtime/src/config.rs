//! # Agent Configuration Module
//!
//! Provides the fully-resolved configuration consumed by the scan/sync core.
//!
//! ## Overview
//!
//! `AgentConfig` is plain data: it deserializes from any serde source (the
//! binary uses a TOML file plus `MUSIC2DB__*` environment overrides) and can
//! also be assembled in code through [`AgentConfigBuilder`]. Either way,
//! [`AgentConfig::validate`] must pass before the core is started; it fails
//! fast with an actionable [`Error::Config`] message.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AgentConfig;
//!
//! let config = AgentConfig::builder()
//!     .music_root("/srv/music")
//!     .base_url("http://localhost")
//!     .port(5005)
//!     .scan_time("03:30")
//!     .build()?;
//!
//! assert_eq!(config.remote.base_url(), "http://localhost:5005");
//! ```

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LoggingConfig};
use bridge_traits::{LogLevel, RetryPolicy};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default extension allow-list.
pub const DEFAULT_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a", "ogg"];

/// Default number of tracks per batch request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Health status string reported by the catalog service when it is ready.
pub const DEFAULT_HEALTH_STATUS: &str = "Server is running";

const SCAN_TIME_FORMAT: &str = "%H:%M";

// ============================================================================
// Agent Configuration
// ============================================================================

/// Complete configuration for the music library agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Root of the music directory tree to scan
    pub music_root: PathBuf,

    /// Extension allow-list; case-insensitive, leading dot optional
    pub extensions: Vec<String>,

    /// Daily local time-of-day for the scheduled cycle, `HH:MM`
    pub scan_time: String,

    /// Run one cycle immediately when the scheduler starts
    pub run_on_startup: bool,

    /// Remote catalog service
    pub remote: RemoteConfig,

    /// Maximum tracks per batch request
    pub batch_size: usize,

    /// Retries per batch after the first attempt
    pub retry_count: u32,

    /// Backoff before the first retry, in milliseconds
    pub retry_backoff_base_ms: u64,

    /// Cap for a single backoff delay, in milliseconds
    pub retry_backoff_max_ms: u64,

    /// Timeout for the health probe and for each sync request, in seconds
    pub network_timeout_secs: u64,

    /// Location of the persisted library snapshot
    pub state_path: PathBuf,

    /// Compute SHA-256 content hashes for change detection
    pub hash_contents: bool,

    /// Skip directories that contain a `.ignore` marker file
    pub respect_ignore_markers: bool,

    /// Log output settings
    pub logging: LogSettings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            music_root: PathBuf::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            scan_time: "03:00".to_string(),
            run_on_startup: true,
            remote: RemoteConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            retry_count: 3,
            retry_backoff_base_ms: 500,
            retry_backoff_max_ms: 30_000,
            network_timeout_secs: 10,
            state_path: PathBuf::from("snapshot.json"),
            hash_contents: true,
            respect_ignore_markers: true,
            logging: LogSettings::default(),
        }
    }
}

impl AgentConfig {
    /// Creates a new builder starting from defaults.
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Validates the configuration, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the offending key and how to fix it.
    pub fn validate(&self) -> Result<()> {
        if self.music_root.as_os_str().is_empty() {
            return Err(Error::Config(
                "music_root is empty. Set it to the directory holding your music library."
                    .to_string(),
            ));
        }

        if self.normalized_extensions().is_empty() {
            return Err(Error::Config(
                "extensions is empty. List at least one audio extension, e.g. [\"mp3\", \"flac\"]."
                    .to_string(),
            ));
        }

        self.scan_time_of_day()?;

        if self.batch_size == 0 {
            return Err(Error::Config(
                "batch_size must be at least 1.".to_string(),
            ));
        }

        if self.network_timeout_secs == 0 {
            return Err(Error::Config(
                "network_timeout_secs must be at least 1.".to_string(),
            ));
        }

        if self.retry_backoff_base_ms > self.retry_backoff_max_ms {
            return Err(Error::Config(format!(
                "retry_backoff_base_ms ({}) exceeds retry_backoff_max_ms ({}).",
                self.retry_backoff_base_ms, self.retry_backoff_max_ms
            )));
        }

        if self.state_path.as_os_str().is_empty() {
            return Err(Error::Config(
                "state_path is empty. Point it at a writable JSON file location.".to_string(),
            ));
        }

        self.remote.validate()
    }

    /// Parsed daily scan time.
    pub fn scan_time_of_day(&self) -> Result<NaiveTime> {
        parse_scan_time(&self.scan_time)
    }

    /// Extensions lowercased with any leading dot removed; empty entries dropped.
    pub fn normalized_extensions(&self) -> Vec<String> {
        let mut normalized: Vec<String> = self
            .extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        normalized
    }

    /// Retry policy applied to every batch request.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_count,
            Duration::from_millis(self.retry_backoff_base_ms),
            Duration::from_millis(self.retry_backoff_max_ms),
        )
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    /// Logging configuration derived from the `[logging]` table.
    pub fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::default()
            .with_level(self.logging.level)
            .with_format(self.logging.format);

        match &self.logging.filter {
            Some(filter) => config.with_filter(filter.clone()),
            None => config,
        }
    }
}

/// Parse an `HH:MM` time of day.
pub fn parse_scan_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), SCAN_TIME_FORMAT).map_err(|e| {
        Error::Config(format!(
            "scan_time '{}' is not a valid HH:MM time of day: {}",
            value, e
        ))
    })
}

// ============================================================================
// Remote Service Configuration
// ============================================================================

/// Address and endpoint paths of the remote catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Scheme and host, e.g. `http://localhost`
    pub url: String,

    /// Optional port appended to `url`
    pub port: Option<u16>,

    pub health_path: String,

    /// When set, the health response JSON `status` field must equal this value
    pub expected_health_status: Option<String>,

    pub one_track_endpoint: String,
    pub many_tracks_endpoint: String,

    /// Deletion endpoint; removals are not transmitted when unset
    pub delete_endpoint: Option<String>,

    pub search_endpoint: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost".to_string(),
            port: Some(5005),
            health_path: "/health/".to_string(),
            expected_health_status: Some(DEFAULT_HEALTH_STATUS.to_string()),
            one_track_endpoint: "/add_track/".to_string(),
            many_tracks_endpoint: "/add_tracks/".to_string(),
            delete_endpoint: None,
            search_endpoint: "/search_tracks/".to_string(),
        }
    }
}

impl RemoteConfig {
    /// `url[:port]` without a trailing slash.
    pub fn base_url(&self) -> String {
        let url = self.url.trim_end_matches('/');
        match self.port {
            Some(port) => format!("{}:{}", url, port),
            None => url.to_string(),
        }
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn health_url(&self) -> String {
        self.endpoint_url(&self.health_path)
    }

    fn validate(&self) -> Result<()> {
        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "remote.url '{}' must start with http:// or https://",
                self.url
            )));
        }

        if url.trim_start_matches("http://").trim_start_matches("https://").is_empty() {
            return Err(Error::Config(format!(
                "remote.url '{}' has no host",
                self.url
            )));
        }

        let endpoints = [
            ("remote.health_path", Some(&self.health_path)),
            ("remote.one_track_endpoint", Some(&self.one_track_endpoint)),
            ("remote.many_tracks_endpoint", Some(&self.many_tracks_endpoint)),
            ("remote.delete_endpoint", self.delete_endpoint.as_ref()),
            ("remote.search_endpoint", Some(&self.search_endpoint)),
        ];

        for (key, value) in endpoints {
            if let Some(path) = value {
                validate_endpoint(key, path)?;
            }
        }

        Ok(())
    }
}

fn validate_endpoint(key: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(Error::Config(format!("{} must not be empty", key)));
    }
    if !path.starts_with('/') {
        return Err(Error::Config(format!(
            "{} '{}' must start with '/'",
            key, path
        )));
    }
    Ok(())
}

// ============================================================================
// Logging Settings
// ============================================================================

/// The `[logging]` table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Full `EnvFilter` directive string; overrides `level` when set
    pub filter: Option<String>,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`AgentConfig`]; `build()` validates.
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    pub fn music_root(mut self, path: impl AsRef<Path>) -> Self {
        self.config.music_root = path.as_ref().to_path_buf();
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn scan_time(mut self, time: impl Into<String>) -> Self {
        self.config.scan_time = time.into();
        self
    }

    pub fn run_on_startup(mut self, enabled: bool) -> Self {
        self.config.run_on_startup = enabled;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.url = url.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.remote.port = Some(port);
        self
    }

    pub fn without_port(mut self) -> Self {
        self.config.remote.port = None;
        self
    }

    pub fn expected_health_status(mut self, status: Option<String>) -> Self {
        self.config.remote.expected_health_status = status;
        self
    }

    pub fn delete_endpoint(mut self, path: impl Into<String>) -> Self {
        self.config.remote.delete_endpoint = Some(path.into());
        self
    }

    pub fn remote(mut self, remote: RemoteConfig) -> Self {
        self.config.remote = remote;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn retry_count(mut self, count: u32) -> Self {
        self.config.retry_count = count;
        self
    }

    /// Set backoff base and cap in milliseconds.
    pub fn retry_backoff_ms(mut self, base: u64, max: u64) -> Self {
        self.config.retry_backoff_base_ms = base;
        self.config.retry_backoff_max_ms = max;
        self
    }

    pub fn network_timeout_secs(mut self, secs: u64) -> Self {
        self.config.network_timeout_secs = secs;
        self
    }

    pub fn state_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.state_path = path.as_ref().to_path_buf();
        self
    }

    pub fn hash_contents(mut self, enabled: bool) -> Self {
        self.config.hash_contents = enabled;
        self
    }

    pub fn respect_ignore_markers(mut self, enabled: bool) -> Self {
        self.config.respect_ignore_markers = enabled;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<AgentConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
