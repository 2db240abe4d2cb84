//! Timer backend abstraction shared by both scheduling paths.
//!
//! The platform offers two very different timer facilities; both hide behind
//! this one trait so the dual-path scheduler can treat redundancy as policy
//! and tests can substitute fakes.

use async_trait::async_trait;

use crate::error::ScheduleError;
use crate::reminder::Reminder;

/// Which path delivered a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPath {
    /// The precise one-shot facility.
    Exact,
    /// The durable delayed-task queue.
    Queue,
}

impl TimerPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPath::Exact => "exact",
            TimerPath::Queue => "queue",
        }
    }
}

impl std::fmt::Display for TimerPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A timer expiry carrying the full reminder payload.
#[derive(Debug, Clone)]
pub struct TimerFire {
    pub reminder: Reminder,
    /// The instant the timer was armed for — half of the dedup key.
    pub trigger_time: i64,
    pub path: TimerPath,
}

/// A one-shot timer facility keyed by reminder id.
///
/// `arm` replaces any existing timer for the same id; `disarm` is idempotent
/// and never fails. Implementations emit a [`TimerFire`] on the engine's
/// shared fire channel when a timer expires.
#[async_trait]
pub trait TimerBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Arm (or re-arm) a timer for `id` at `fire_at` epoch milliseconds.
    async fn arm(&self, id: &str, fire_at: i64, payload: Reminder) -> Result<(), ScheduleError>;

    /// Cancel the timer for `id`, if any.
    async fn disarm(&self, id: &str);

    /// Whether a timer is currently armed for `id`.
    async fn is_armed(&self, id: &str) -> bool;
}
