//! Alarm presentation controller.
//!
//! Owns the per-trigger state machine `Presenting -> {Dismissed | Snoozed |
//! Completed}`: races the presentation surface against the auto-dismiss
//! timeout, releases the wake resource on every exit path, then advances
//! recurrence or retires the reminder and persists the result.

pub mod presenter;

pub use presenter::{AlarmHandle, AlarmPresenter, AlarmView, LogPresenter, UserAction};

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::mpsc;

use crate::events::{self, EngineEvent, EventSender};
use crate::recurrence::next_future_trigger_millis;
use crate::reminder::{Reminder, now_millis};
use crate::scheduler::DualPathScheduler;
use crate::store::ReminderStore;
use crate::wake::WakeGuard;

/// How a presentation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Dismissed { auto: bool },
    Snoozed,
    Completed,
}

pub struct AlarmController {
    presenter: Arc<dyn AlarmPresenter>,
    scheduler: Arc<DualPathScheduler>,
    store: Arc<dyn ReminderStore>,
    events: EventSender,
    auto_dismiss: Duration,
}

impl AlarmController {
    pub fn new(
        presenter: Arc<dyn AlarmPresenter>,
        scheduler: Arc<DualPathScheduler>,
        store: Arc<dyn ReminderStore>,
        events: EventSender,
        auto_dismiss: Duration,
    ) -> Self {
        Self {
            presenter,
            scheduler,
            store,
            events,
            auto_dismiss,
        }
    }

    /// Present a triggered reminder and drive it to resolution.
    ///
    /// The wake guard is held for the duration of the ring and dropped
    /// before any store or scheduling work.
    pub async fn present(&self, reminder: Reminder, wake: WakeGuard) {
        // Quiet path: non-alarm preference, or no usable display fields.
        // A reminder must never fail to notify in some form.
        if !reminder.alarm_style || reminder.title.trim().is_empty() {
            let title = if reminder.title.trim().is_empty() {
                "Reminder"
            } else {
                reminder.title.as_str()
            };
            self.presenter
                .present_quiet(title, &reminder.description)
                .await;
            drop(wake);
            self.resolve(reminder, Resolution::Dismissed { auto: true })
                .await;
            return;
        }

        let view = AlarmView::for_reminder(&reminder);
        let (tx, mut rx) = mpsc::channel(4);
        self.presenter
            .present_alarm(view, AlarmHandle::new(tx))
            .await;

        let resolution = tokio::select! {
            action = rx.recv() => match action {
                Some(UserAction::Dismiss) => Resolution::Dismissed { auto: false },
                Some(UserAction::Snooze) => Resolution::Snoozed,
                Some(UserAction::Complete) => Resolution::Completed,
                // Surface dropped the handle without acting.
                None => Resolution::Dismissed { auto: true },
            },
            _ = tokio::time::sleep(self.auto_dismiss) => {
                tracing::info!(reminder_id = %reminder.id, "Alarm timed out, auto-dismissing");
                Resolution::Dismissed { auto: true }
            }
        };
        // Receiver is gone from here on: late dismiss/snooze calls are no-ops.
        drop(rx);
        drop(wake);

        self.resolve(reminder, resolution).await;
    }

    async fn resolve(&self, reminder: Reminder, resolution: Resolution) {
        match resolution {
            Resolution::Dismissed { auto } => {
                events::emit(
                    &self.events,
                    EngineEvent::Dismissed {
                        id: reminder.id.clone(),
                        auto,
                    },
                );
                self.finish_occurrence(reminder, false).await;
            }
            Resolution::Completed => {
                events::emit(
                    &self.events,
                    EngineEvent::Completed {
                        id: reminder.id.clone(),
                    },
                );
                self.finish_occurrence(reminder, true).await;
            }
            Resolution::Snoozed => self.snooze(reminder).await,
        }
    }

    /// Advance recurrence or retire the reminder after a dismiss/complete.
    async fn finish_occurrence(&self, mut reminder: Reminder, completed: bool) {
        if completed {
            reminder.completed = true;
        }

        if reminder.repeat_mode.repeats() {
            let now = now_millis();
            match next_future_trigger_millis(reminder.trigger_time, reminder.repeat_mode, now, &Local)
            {
                Some(next) => {
                    reminder.trigger_time = next;
                    reminder.touch();
                    self.persist(&reminder).await;
                    if let Err(e) = self.scheduler.schedule(&reminder).await {
                        tracing::warn!(
                            reminder_id = %reminder.id,
                            "Could not arm next occurrence: {}", e
                        );
                    }
                }
                None => {
                    tracing::warn!(
                        reminder_id = %reminder.id,
                        "Recurrence advance failed, deactivating"
                    );
                    reminder.active = false;
                    reminder.touch();
                    self.persist(&reminder).await;
                    self.scheduler.cancel(&reminder.id).await;
                }
            }
        } else {
            reminder.active = false;
            reminder.touch();
            self.persist(&reminder).await;
            // The path that did not win the dedup race may still hold a timer.
            self.scheduler.cancel(&reminder.id).await;
        }
    }

    /// Arm the one-off snooze clone, then finish the source occurrence.
    ///
    /// The clone defers presentation; the source's recurrence advances
    /// exactly as a dismiss would have, so snoozing never shifts the chain.
    async fn snooze(&self, reminder: Reminder) {
        let now = now_millis();
        let clone = reminder.snoozed(now);
        events::emit(
            &self.events,
            EngineEvent::Snoozed {
                id: reminder.id.clone(),
                until: clone.trigger_time,
            },
        );

        // Persist first so a guard rearm re-arms the clone; schedule even if
        // the write failed — the user asked to be reminded again.
        self.persist(&clone).await;
        if let Err(e) = self.scheduler.schedule(&clone).await {
            tracing::warn!(reminder_id = %clone.id, "Could not arm snooze: {}", e);
        }

        self.finish_occurrence(reminder, false).await;
    }

    async fn persist(&self, reminder: &Reminder) {
        if let Err(e) = self.store.update_reminder(reminder).await {
            tracing::warn!(reminder_id = %reminder.id, "Store update failed: {}", e);
        }
    }
}
