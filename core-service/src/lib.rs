//! # Agent Service
//!
//! Façade over the sync pipeline and the cycle scheduler.
//!
//! ## Overview
//!
//! [`Music2Db`] builds every component from an [`AgentConfig`] and the host
//! dependencies ([`AgentDependencies`]): the HTTP transport, the snapshot
//! store and the clock. The CLI uses it to run the daily scheduler, a single
//! cycle, a one-off metadata dump, or a tag search.
//!
//! [`AgentConfig`]: core_runtime::AgentConfig

pub mod error;
pub mod scheduler;
pub mod service;

pub use error::{Result, ServiceError};
pub use scheduler::{next_run_after, Scheduler, TriggerOutcome};
pub use service::{AgentDependencies, Music2Db};
