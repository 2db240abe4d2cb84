//! Engine event surface.
//!
//! Every observable lifecycle transition is broadcast so an embedding UI can
//! refresh its reminder list and telemetry can count degraded-mode arms
//! without the core knowing either exists.

use serde::Serialize;
use tokio::sync::broadcast;

/// An observable engine-side lifecycle event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Both timer paths armed for a reminder.
    Armed { id: String, trigger_time: i64 },
    /// One timer path failed; the other carries the reminder.
    Degraded { id: String, failed_path: String },
    /// Neither timer path could be armed — the user-visible failure.
    ScheduleFailed { id: String },
    /// A timer fire passed de-duplication.
    Triggered { id: String, trigger_time: i64 },
    /// A fire was dropped before presentation (deactivated or deleted).
    Skipped { id: String, reason: String },
    /// The alarm resolved as a dismissal; `auto` marks the timeout path.
    Dismissed { id: String, auto: bool },
    /// The alarm was snoozed; a one-off clone is armed for `until`.
    Snoozed { id: String, until: i64 },
    /// The alarm was resolved as completed.
    Completed { id: String },
    /// A one-shot reminder's time passed while nothing was armed.
    Missed { id: String },
    /// A rearm pass finished.
    Rearmed {
        armed: usize,
        degraded: usize,
        missed: usize,
        failed: usize,
    },
    /// The keep-alive guard restarted after an unexpected teardown.
    GuardRestarted { restarts: u64 },
}

/// Sender half of the engine's event broadcast.
pub type EventSender = broadcast::Sender<EngineEvent>;

/// Broadcast an event, ignoring the no-subscriber case.
pub(crate) fn emit(tx: &EventSender, event: EngineEvent) {
    let _ = tx.send(event);
}
