//! Engine configuration.

use std::time::Duration;

/// Tunables for the scheduling and delivery engine.
///
/// Defaults match the behavior of the shipped product: a one-minute ring,
/// a five-second guard restart delay, and missed-reminder notifications off.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long an alarm rings before it resolves as an automatic dismissal.
    pub auto_dismiss: Duration,
    /// Delay before the keep-alive guard re-arms after an unexpected teardown.
    pub restart_delay: Duration,
    /// Poll interval of the durable delayed-task queue path.
    pub queue_tick: Duration,
    /// Bound on the trigger de-duplication set.
    pub dedup_capacity: usize,
    /// Surface one-shot reminders missed within `missed_window` as quiet
    /// notifications at rearm time.
    pub notify_missed: bool,
    /// How far back the missed-reminder pass looks.
    pub missed_window: Duration,
    /// Depth of the fire channel shared by both timer backends.
    pub fire_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_dismiss: Duration::from_secs(60),
            restart_delay: Duration::from_secs(5),
            queue_tick: Duration::from_secs(30),
            dedup_capacity: 1024,
            notify_missed: false,
            missed_window: Duration::from_secs(24 * 3600),
            fire_channel_capacity: 64,
        }
    }
}
