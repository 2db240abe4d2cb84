//! Error types for the reminder engine.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Scheduling error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Guard error: {0}")]
    Guard(#[from] GuardError),
}

/// Timer arming and cancellation errors.
///
/// Only `AllPathsFailed` is user-visible; everything else is either a caller
/// contract violation or degrades to the surviving path.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Reminder {id} is inactive and cannot be armed")]
    Inactive { id: String },

    #[error("Reminder {id} fires in the past ({trigger_time} <= {now})")]
    InPast {
        id: String,
        trigger_time: i64,
        now: i64,
    },

    #[error("Backend {backend} denied the arm request for {id}: {reason}")]
    Denied {
        backend: &'static str,
        id: String,
        reason: String,
    },

    #[error("Backend {backend} failed to arm {id}: {reason}")]
    Backend {
        backend: &'static str,
        id: String,
        reason: String,
    },

    #[error("Both timer paths failed to arm reminder {id}")]
    AllPathsFailed { id: String },
}

/// Reminder store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Reminder not found: {id}")]
    NotFound { id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Keep-alive guard errors.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Guard is already running (state: {state})")]
    AlreadyRunning { state: String },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
