//! # Event Bus System
//!
//! Broadcasts cycle lifecycle events from the scheduler to any interested
//! listener using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: `CoreEvent` wrapping domain-specific enums
//! - **EventBus**: Central broadcast channel for publishing events
//!
//! Emitting with no subscribers is not an error worth surfacing; callers
//! typically discard the result with `.ok()`.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, CycleEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(16);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Cycle(CycleEvent::TriggerDropped {
//!         reason: "cycle already running".to_string(),
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Trigger dropped");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Scan/sync cycle lifecycle events
    Cycle(CycleEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Cycle(e) => e.description(),
        }
    }
}

// ============================================================================
// Cycle Events
// ============================================================================

/// Counters attached to a completed cycle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleCounts {
    pub scanned: u64,
    pub added: u64,
    pub modified: u64,
    pub removed: u64,
    pub synced: u64,
    pub failed: u64,
    pub unreadable: u64,
}

/// Events describing one scan/sync cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CycleEvent {
    /// A cycle began running.
    Started {
        /// Unique identifier for this cycle.
        cycle_id: String,
        /// What caused the cycle ("schedule", "startup", "manual").
        trigger: String,
    },
    /// A cycle reached a terminal state.
    Completed {
        cycle_id: String,
        /// Terminal state name (`succeeded`, `partially_failed`, `failed`, `cancelled`).
        outcome: String,
        counts: CycleCounts,
        duration_ms: u64,
    },
    /// A trigger arrived while a cycle was already running and was discarded.
    TriggerDropped { reason: String },
}

impl CycleEvent {
    pub fn description(&self) -> &str {
        match self {
            CycleEvent::Started { .. } => "Cycle started",
            CycleEvent::Completed { .. } => "Cycle completed",
            CycleEvent::TriggerDropped { .. } => "Trigger dropped",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for broadcasting events to multiple subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// Subscribers falling behind by more than `capacity` events receive
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
