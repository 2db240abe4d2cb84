//! Alarm presentation boundary.
//!
//! The engine never renders pixels. It hands the presentation subsystem an
//! [`AlarmView`] plus an [`AlarmHandle`] and waits for a resolution; the
//! quiet-notification form is the fallback when a full alarm cannot or
//! should not be shown.

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::mpsc;

use crate::reminder::Reminder;

/// Display payload for the full-screen alarm.
#[derive(Debug, Clone)]
pub struct AlarmView {
    pub reminder_id: String,
    pub title: String,
    pub body: String,
    pub sound_uri: Option<String>,
    pub vibrate: bool,
    /// 0-100.
    pub volume: u8,
    /// Wall-clock strings for the ringing screen.
    pub time_text: String,
    pub date_text: String,
}

impl AlarmView {
    /// Build the view for a reminder ringing right now.
    pub fn for_reminder(reminder: &Reminder) -> Self {
        let now = Local::now();
        Self {
            reminder_id: reminder.id.clone(),
            title: reminder.title.clone(),
            body: reminder.description.clone(),
            sound_uri: reminder.sound_uri.clone(),
            vibrate: reminder.vibrate,
            volume: reminder.volume.min(100),
            time_text: now.format("%H:%M").to_string(),
            date_text: now.format("%A, %d/%m/%Y").to_string(),
        }
    }
}

/// Action taken on a ringing alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Dismiss,
    Snooze,
    Complete,
}

/// Resolution channel handed to the presentation surface.
///
/// The first accepted action wins; once the alarm has resolved — by user
/// action or by the auto-dismiss timeout — every further call is a no-op.
/// Dropping the handle without acting resolves the alarm as an immediate
/// automatic dismissal.
#[derive(Debug, Clone)]
pub struct AlarmHandle {
    tx: mpsc::Sender<UserAction>,
}

impl AlarmHandle {
    pub(crate) fn new(tx: mpsc::Sender<UserAction>) -> Self {
        Self { tx }
    }

    pub fn dismiss(&self) {
        self.send(UserAction::Dismiss);
    }

    pub fn snooze(&self) {
        self.send(UserAction::Snooze);
    }

    pub fn complete(&self) {
        self.send(UserAction::Complete);
    }

    fn send(&self, action: UserAction) {
        // Fails only after the alarm has resolved; late calls are no-ops.
        if self.tx.try_send(action).is_err() {
            tracing::debug!(?action, "Alarm already resolved, ignoring action");
        }
    }
}

/// Presentation surface consumed by the engine.
///
/// `present_alarm` should start the surface and return promptly; user
/// actions flow back through the handle.
#[async_trait]
pub trait AlarmPresenter: Send + Sync {
    async fn present_alarm(&self, view: AlarmView, handle: AlarmHandle);

    /// Minimal notification form; also used for missed reminders.
    async fn present_quiet(&self, title: &str, body: &str);
}

/// Presenter that renders to the log.
///
/// Drops the handle immediately, so alarms resolve as automatic dismissals —
/// enough for the demo binary and headless deployments.
pub struct LogPresenter;

#[async_trait]
impl AlarmPresenter for LogPresenter {
    async fn present_alarm(&self, view: AlarmView, _handle: AlarmHandle) {
        tracing::info!(
            reminder_id = %view.reminder_id,
            volume = view.volume,
            vibrate = view.vibrate,
            "ALARM {} — {} ({} {})",
            view.title,
            view.body,
            view.date_text,
            view.time_text,
        );
    }

    async fn present_quiet(&self, title: &str, body: &str) {
        tracing::info!("Notification: {} — {}", title, body);
    }
}
