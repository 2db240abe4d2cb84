//! Dual-path scheduling.
//!
//! Every active reminder is armed on two independent timer backends — the
//! precise exact-timer path and the durable delayed-task queue — both
//! targeting the same instant. Either backend may be silently dropped by
//! the platform; the trigger funnel de-duplicates the case where both
//! survive. Losing one path degrades precision, losing both is the single
//! escalated failure.

pub mod backend;
pub mod exact;
pub mod queue;

pub use backend::{TimerBackend, TimerFire, TimerPath};
pub use exact::ExactTimers;
pub use queue::DelayQueue;

use std::sync::Arc;

use chrono::Local;

use crate::error::ScheduleError;
use crate::events::{self, EngineEvent, EventSender};
use crate::recurrence::next_future_trigger_millis;
use crate::reminder::{Reminder, now_millis};

/// Result of a successful `schedule` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Both paths armed.
    Armed,
    /// One path refused; the other carries the reminder at best-effort
    /// precision. A telemetry signal, not an error.
    Degraded { failed_path: TimerPath },
}

/// Outcome of a batch rearm pass.
#[derive(Debug, Default)]
pub struct RearmReport {
    /// Reminders with at least one armed path.
    pub armed: usize,
    /// Subset of `armed` running on a single path.
    pub degraded: usize,
    /// Reminders that could not be armed at all.
    pub failed: usize,
    /// Stale repeating reminders advanced to their next future occurrence;
    /// the caller persists these.
    pub advanced: Vec<Reminder>,
    /// One-shot reminders whose time passed while nothing was armed.
    pub missed: Vec<Reminder>,
}

/// Arms, re-arms, and cancels reminder timers across both backends.
pub struct DualPathScheduler {
    exact: Arc<dyn TimerBackend>,
    queue: Arc<dyn TimerBackend>,
    events: EventSender,
}

impl DualPathScheduler {
    pub fn new(
        exact: Arc<dyn TimerBackend>,
        queue: Arc<dyn TimerBackend>,
        events: EventSender,
    ) -> Self {
        Self {
            exact,
            queue,
            events,
        }
    }

    /// Arm both timer paths for an active, future reminder.
    ///
    /// Cancels any existing pair for the same id first, so re-scheduling is
    /// last-write-wins and at most one pair is ever outstanding per id.
    pub async fn schedule(&self, reminder: &Reminder) -> Result<ScheduleOutcome, ScheduleError> {
        if !reminder.active {
            return Err(ScheduleError::Inactive {
                id: reminder.id.clone(),
            });
        }
        let now = now_millis();
        if reminder.trigger_time <= now {
            return Err(ScheduleError::InPast {
                id: reminder.id.clone(),
                trigger_time: reminder.trigger_time,
                now,
            });
        }

        self.cancel(&reminder.id).await;

        let primary = self
            .exact
            .arm(&reminder.id, reminder.trigger_time, reminder.clone())
            .await;
        let backup = self
            .queue
            .arm(&reminder.id, reminder.trigger_time, reminder.clone())
            .await;

        match (primary, backup) {
            (Ok(()), Ok(())) => {
                tracing::debug!(
                    reminder_id = %reminder.id,
                    trigger_time = reminder.trigger_time,
                    "Reminder armed on both paths"
                );
                events::emit(
                    &self.events,
                    EngineEvent::Armed {
                        id: reminder.id.clone(),
                        trigger_time: reminder.trigger_time,
                    },
                );
                Ok(ScheduleOutcome::Armed)
            }
            (Err(e), Ok(())) => {
                tracing::warn!(
                    reminder_id = %reminder.id,
                    "Exact path unavailable, queue path carries the reminder: {}", e
                );
                events::emit(
                    &self.events,
                    EngineEvent::Degraded {
                        id: reminder.id.clone(),
                        failed_path: TimerPath::Exact.as_str().to_string(),
                    },
                );
                Ok(ScheduleOutcome::Degraded {
                    failed_path: TimerPath::Exact,
                })
            }
            (Ok(()), Err(e)) => {
                tracing::warn!(
                    reminder_id = %reminder.id,
                    "Queue path unavailable, exact path carries the reminder: {}", e
                );
                events::emit(
                    &self.events,
                    EngineEvent::Degraded {
                        id: reminder.id.clone(),
                        failed_path: TimerPath::Queue.as_str().to_string(),
                    },
                );
                Ok(ScheduleOutcome::Degraded {
                    failed_path: TimerPath::Queue,
                })
            }
            (Err(primary), Err(backup)) => {
                tracing::error!(
                    reminder_id = %reminder.id,
                    "Neither timer path could be armed: {}; {}", primary, backup
                );
                events::emit(
                    &self.events,
                    EngineEvent::ScheduleFailed {
                        id: reminder.id.clone(),
                    },
                );
                Err(ScheduleError::AllPathsFailed {
                    id: reminder.id.clone(),
                })
            }
        }
    }

    /// Cancel both timer paths for `id`. Idempotent; never fails.
    pub async fn cancel(&self, id: &str) {
        self.exact.disarm(id).await;
        self.queue.disarm(id).await;
    }

    /// Which paths currently hold a timer for `id`: `(exact, queue)`.
    pub async fn armed_paths(&self, id: &str) -> (bool, bool) {
        (self.exact.is_armed(id).await, self.queue.is_armed(id).await)
    }

    /// Re-arm a set of active reminders, tolerating individual failures.
    ///
    /// Stale repeating reminders are advanced through the local calendar to
    /// their next future occurrence; stale one-shots are reported as missed.
    pub async fn schedule_all_active(&self, reminders: Vec<Reminder>) -> RearmReport {
        let now = now_millis();
        let mut report = RearmReport::default();

        for mut reminder in reminders {
            if !reminder.active {
                continue;
            }

            let mut advanced = false;
            if reminder.trigger_time <= now {
                if reminder.repeat_mode.repeats() {
                    match next_future_trigger_millis(
                        reminder.trigger_time,
                        reminder.repeat_mode,
                        now,
                        &Local,
                    ) {
                        Some(next) => {
                            reminder.trigger_time = next;
                            reminder.touch();
                            advanced = true;
                        }
                        None => {
                            tracing::warn!(
                                reminder_id = %reminder.id,
                                "Could not advance stale repeating reminder"
                            );
                            report.failed += 1;
                            continue;
                        }
                    }
                } else {
                    report.missed.push(reminder);
                    continue;
                }
            }

            match self.schedule(&reminder).await {
                Ok(ScheduleOutcome::Armed) => report.armed += 1,
                Ok(ScheduleOutcome::Degraded { .. }) => {
                    report.armed += 1;
                    report.degraded += 1;
                }
                Err(e) => {
                    tracing::warn!(reminder_id = %reminder.id, "Rearm failed: {}", e);
                    report.failed += 1;
                    continue;
                }
            }
            if advanced {
                report.advanced.push(reminder);
            }
        }

        tracing::info!(
            armed = report.armed,
            degraded = report.degraded,
            missed = report.missed.len(),
            failed = report.failed,
            "Re-armed active reminders"
        );
        events::emit(
            &self.events,
            EngineEvent::Rearmed {
                armed: report.armed,
                degraded: report.degraded,
                missed: report.missed.len(),
                failed: report.failed,
            },
        );
        report
    }
}
