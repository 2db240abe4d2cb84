//! Reminder data model.
//!
//! Reminders are owned by the external store; the engine consumes them,
//! flips `active`/`completed`, and advances `trigger_time` on recurrence.
//! Timestamps are epoch milliseconds to match the store's wire format.

use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recurrence policy of a reminder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Fires once, then is deactivated.
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl RepeatMode {
    /// Whether resolving a trigger should produce a next occurrence.
    pub fn repeats(&self) -> bool {
        !matches!(self, RepeatMode::None)
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RepeatMode::None => "none",
            RepeatMode::Daily => "daily",
            RepeatMode::Weekly => "weekly",
            RepeatMode::Monthly => "monthly",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RepeatMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(RepeatMode::None),
            "daily" => Ok(RepeatMode::Daily),
            "weekly" => Ok(RepeatMode::Weekly),
            "monthly" => Ok(RepeatMode::Monthly),
            other => Err(format!("unknown repeat mode: {other}")),
        }
    }
}

/// A user-defined reminder with alarm presentation preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    /// Epoch-millisecond instant the reminder should fire.
    pub trigger_time: i64,
    pub repeat_mode: RepeatMode,
    /// Only active reminders may be armed.
    pub active: bool,
    /// Semantic completion flag, distinct from a silent dismiss.
    pub completed: bool,
    /// Full-screen intrusive alarm vs. a quiet notification.
    pub alarm_style: bool,
    pub sound_id: Option<String>,
    pub sound_name: Option<String>,
    pub sound_uri: Option<String>,
    pub vibrate: bool,
    /// Playback volume, 0-100.
    pub volume: u8,
    /// Minutes to postpone on snooze. Always at least 1.
    pub snooze_minutes: u32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Reminder {
    /// Create a reminder with the store's default presentation preferences.
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        trigger_time: i64,
    ) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: description.into(),
            trigger_time,
            repeat_mode: RepeatMode::None,
            active: true,
            completed: false,
            alarm_style: true,
            sound_id: Some("default_alarm".to_string()),
            sound_name: None,
            sound_uri: None,
            vibrate: true,
            volume: 80,
            snooze_minutes: 5,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at` to the current instant.
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    /// Whether the reminder's trigger instant has passed.
    pub fn is_due(&self, now: i64) -> bool {
        self.active && self.trigger_time <= now
    }

    /// Derive the one-off clone armed by a snooze.
    ///
    /// The clone gets a fresh engine-minted id and never repeats; the
    /// original's recurrence chain is unaffected by it.
    pub fn snoozed(&self, now: i64) -> Reminder {
        let minutes = self.snooze_minutes.max(1) as i64;
        let mut clone = self.clone();
        clone.id = format!("snooze-{}", Uuid::new_v4());
        clone.title = format!("{} (snoozed)", self.title);
        clone.trigger_time = now + minutes * 60_000;
        clone.repeat_mode = RepeatMode::None;
        clone.active = true;
        clone.completed = false;
        clone.created_at = now;
        clone.updated_at = now;
        clone
    }
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
