//! # Cycle Scheduler
//!
//! Decides when cycles run and guarantees that at most one runs at a time.
//!
//! ## Overview
//!
//! - A timer loop fires once a day at the configured local time, and
//!   optionally once immediately on startup
//! - [`Scheduler::trigger`] runs a cycle on demand
//! - A busy flag makes overlapping triggers no-ops: the second trigger is
//!   dropped, logged, and reported as a `TriggerDropped` event
//! - Shutdown cancels the running cycle and stops the timer
//!
//! Cycle lifecycle events (`Started`, `Completed`) are published on the
//! [`EventBus`].

use bridge_traits::time::Clock;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone};
use core_runtime::events::{CoreEvent, CycleEvent, EventBus};
use core_sync::{Cycle, CycleRunner, CycleTrigger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of asking for a cycle
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The cycle ran to a terminal state
    Completed(Cycle),
    /// Another cycle was running; nothing happened
    Dropped,
}

impl TriggerOutcome {
    pub fn cycle(&self) -> Option<&Cycle> {
        match self {
            TriggerOutcome::Completed(cycle) => Some(cycle),
            TriggerOutcome::Dropped => None,
        }
    }
}

/// Cheap to clone; clones share the busy flag.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    runner: Arc<dyn CycleRunner>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    scan_time: NaiveTime,
    busy: AtomicBool,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        runner: Arc<dyn CycleRunner>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        scan_time: NaiveTime,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                runner,
                clock,
                events,
                scan_time,
                busy: AtomicBool::new(false),
                shutdown,
            }),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub fn scan_time(&self) -> NaiveTime {
        self.inner.scan_time
    }

    /// Stop the timer loop and cancel the running cycle, if any.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Run one cycle now, unless one is already running.
    pub async fn trigger(&self, trigger: CycleTrigger) -> TriggerOutcome {
        let Some(_guard) = BusyGuard::acquire(&self.inner.busy) else {
            info!(%trigger, "Cycle already running, trigger dropped");
            self.emit(CycleEvent::TriggerDropped {
                reason: format!("{} trigger while a cycle was running", trigger),
            });
            return TriggerOutcome::Dropped;
        };

        let cycle = Cycle::new(trigger);
        self.emit(CycleEvent::Started {
            cycle_id: cycle.id.to_string(),
            trigger: trigger.to_string(),
        });

        let cycle = self
            .inner
            .runner
            .run_cycle(cycle, self.inner.shutdown.child_token())
            .await;

        self.emit(CycleEvent::Completed {
            cycle_id: cycle.id.to_string(),
            outcome: cycle.state.to_string(),
            counts: cycle.counts,
            duration_ms: cycle.duration_ms().unwrap_or(0),
        });
        TriggerOutcome::Completed(cycle)
    }

    /// Timer loop; returns after [`shutdown`](Self::shutdown).
    pub async fn run(&self, run_on_startup: bool) {
        if run_on_startup && !self.inner.shutdown.is_cancelled() {
            self.trigger(CycleTrigger::Startup).await;
        }

        loop {
            let now = self.inner.clock.now_local();
            let next = next_run_after(&now, self.inner.scan_time);
            let wait = (next.clone() - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next, "Next scheduled cycle");

            tokio::select! {
                _ = self.inner.shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {
                    self.trigger(CycleTrigger::Schedule).await;
                }
            }
        }

        info!("Scheduler stopped");
    }

    fn emit(&self, event: CycleEvent) {
        if self.inner.events.emit(CoreEvent::Cycle(event)).is_err() {
            debug!("No event subscribers");
        }
    }
}

/// Resets the busy flag when dropped, including on panic.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// First instant strictly after `now` whose local time of day is `at`.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let local_now = now.naive_local();
    let today = local_now.date().and_time(at);
    let candidate = if today > local_now {
        today
    } else {
        today + ChronoDuration::days(1)
    };

    // A time skipped by a DST jump falls back to a day from now
    now.timezone()
        .from_local_datetime(&candidate)
        .earliest()
        .unwrap_or_else(|| now.clone() + ChronoDuration::days(1))
}
