//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the agent crates:
//! - Configuration (`AgentConfig`) with fail-fast validation
//! - Logging and tracing initialization
//! - Event bus for cycle lifecycle notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AgentConfig, AgentConfigBuilder, LogSettings, RemoteConfig};
pub use error::{Error, Result};
