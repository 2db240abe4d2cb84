//! Repeat recalculation — pure calendar arithmetic, no side effects.
//!
//! Recurrence advances through the local calendar rather than by adding a
//! fixed number of milliseconds, so a daily reminder keeps its wall-clock
//! hour across DST transitions and a monthly one clamps Jan 31 to the last
//! valid day of February.

use chrono::{DateTime, Days, Months, TimeZone, Utc};

use crate::reminder::RepeatMode;

/// Next occurrence of a repeating trigger, one step forward.
///
/// Returns `None` for [`RepeatMode::None`] and when the target wall-clock
/// time does not resolve in the given timezone (a DST gap).
pub fn next_occurrence<Tz: TimeZone>(at: DateTime<Tz>, mode: RepeatMode) -> Option<DateTime<Tz>> {
    match mode {
        RepeatMode::None => None,
        RepeatMode::Daily => at.checked_add_days(Days::new(1)),
        RepeatMode::Weekly => at.checked_add_days(Days::new(7)),
        // Clamps to the last valid day of the target month.
        RepeatMode::Monthly => at.checked_add_months(Months::new(1)),
    }
}

/// Advance an epoch-millisecond trigger one occurrence in `tz`.
///
/// Falls back to shifting the UTC instant when the local wall-clock result
/// does not exist or is ambiguous, so a repeating reminder never gets stuck
/// on a DST boundary.
pub fn next_trigger_millis<Tz: TimeZone>(
    trigger_time: i64,
    mode: RepeatMode,
    tz: &Tz,
) -> Option<i64> {
    if !mode.repeats() {
        return None;
    }

    if let Some(at) = tz.timestamp_millis_opt(trigger_time).single()
        && let Some(next) = next_occurrence(at, mode)
    {
        return Some(next.timestamp_millis());
    }

    let utc = Utc.timestamp_millis_opt(trigger_time).single()?;
    next_occurrence(utc, mode).map(|next| next.timestamp_millis())
}

/// Advance a stale repeating trigger until it is strictly in the future.
///
/// Used at rearm time: a device that slept through several occurrences arms
/// the next real one instead of ringing once per missed period. A trigger
/// already in the future is returned unchanged.
pub fn next_future_trigger_millis<Tz: TimeZone>(
    trigger_time: i64,
    mode: RepeatMode,
    now: i64,
    tz: &Tz,
) -> Option<i64> {
    if !mode.repeats() {
        return None;
    }

    let mut t = trigger_time;
    while t <= now {
        t = next_trigger_millis(t, mode, tz)?;
    }
    Some(t)
}
