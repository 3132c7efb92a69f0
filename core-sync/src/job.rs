//! # Sync Cycle State Machine
//!
//! Tracks one scan/sync cycle from start to its terminal outcome.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Running → Succeeded
//!   ↓       ├────→ PartiallyFailed
//!   │       ├────→ Failed
//!   └───────┴────→ Cancelled
//! ```
//!
//! Returning to idle is the scheduler's concern: a finished `Cycle` is a
//! record, and the next trigger creates a fresh one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{Cycle, CycleState, CycleTrigger};
//!
//! let mut cycle = Cycle::new(CycleTrigger::Manual);
//! cycle.start()?;
//! cycle.finish(CycleState::Succeeded)?;
//! assert!(cycle.state.is_terminal());
//! ```

use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use core_runtime::events::CycleCounts;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleId(Uuid);

impl CycleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    /// Created, not yet started
    Idle,
    Running,
    /// Every update was delivered
    Succeeded,
    /// Some batches failed; delivered paths were still persisted
    PartiallyFailed,
    /// Aborted before or during the cycle; nothing persisted
    Failed,
    /// Stopped by shutdown; nothing persisted
    Cancelled,
}

impl CycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CycleState::Succeeded
                | CycleState::PartiallyFailed
                | CycleState::Failed
                | CycleState::Cancelled
        )
    }

    /// Whether a cycle ending in this state writes the next baseline
    pub fn persists_baseline(&self) -> bool {
        matches!(self, CycleState::Succeeded | CycleState::PartiallyFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CycleState::Idle => "idle",
            CycleState::Running => "running",
            CycleState::Succeeded => "succeeded",
            CycleState::PartiallyFailed => "partially_failed",
            CycleState::Failed => "failed",
            CycleState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleTrigger {
    /// Daily timer
    Schedule,
    /// Immediately after the agent starts
    Startup,
    /// Explicit `trigger()` call
    Manual,
}

impl CycleTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleTrigger::Schedule => "schedule",
            CycleTrigger::Startup => "startup",
            CycleTrigger::Manual => "manual",
        }
    }
}

impl std::fmt::Display for CycleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Cycle Entity
// ============================================================================

/// One scan/sync cycle and its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub trigger: CycleTrigger,
    pub state: CycleState,
    pub counts: CycleCounts,
    /// Reason for a `Failed` outcome
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Cycle {
    pub fn new(trigger: CycleTrigger) -> Self {
        Self {
            id: CycleId::new(),
            trigger,
            state: CycleState::Idle,
            counts: CycleCounts::default(),
            error_message: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the cycle is not `Idle`
    pub fn start(&mut self) -> Result<()> {
        self.validate_transition(CycleState::Running)?;
        self.state = CycleState::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Move to `Succeeded` or `PartiallyFailed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cycle is not running or `outcome` is not a
    /// delivery outcome
    pub fn finish(&mut self, outcome: CycleState) -> Result<()> {
        if !matches!(outcome, CycleState::Succeeded | CycleState::PartiallyFailed) {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: outcome.as_str().to_string(),
                reason: "finish() only records delivery outcomes".to_string(),
            });
        }
        self.transition_to_terminal(outcome)
    }

    /// # Errors
    ///
    /// Returns an error if the cycle is already terminal
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<()> {
        self.transition_to_terminal(CycleState::Failed)?;
        self.error_message = Some(error_message.into());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the cycle is already terminal
    pub fn cancel(&mut self) -> Result<()> {
        self.transition_to_terminal(CycleState::Cancelled)
    }

    /// Wall-clock duration in milliseconds, once the cycle has finished
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds().max(0) as u64),
            _ => None,
        }
    }

    fn transition_to_terminal(&mut self, to: CycleState) -> Result<()> {
        self.validate_transition(to)?;
        self.state = to;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    fn validate_transition(&self, to: CycleState) -> Result<()> {
        let valid = match (self.state, to) {
            (CycleState::Idle, CycleState::Running) => true,
            (CycleState::Idle, CycleState::Failed) => true,
            (CycleState::Idle, CycleState::Cancelled) => true,

            (CycleState::Running, CycleState::Succeeded) => true,
            (CycleState::Running, CycleState::PartiallyFailed) => true,
            (CycleState::Running, CycleState::Failed) => true,
            (CycleState::Running, CycleState::Cancelled) => true,

            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.state.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.state.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
