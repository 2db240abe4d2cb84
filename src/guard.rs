//! Keep-alive guard.
//!
//! A supervisor, not a scheduler: its only job is keeping the scheduler's
//! in-memory arming state consistent with the store across involuntary
//! teardowns. Restart-on-death and stop-requested are two distinct inputs
//! with two distinct transitions — conflating them is the classic
//! infinite-restart bug, so the state machine keeps them apart explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::alarm::AlarmPresenter;
use crate::config::EngineConfig;
use crate::error::GuardError;
use crate::events::{self, EngineEvent, EventSender};
use crate::reminder::now_millis;
use crate::scheduler::DualPathScheduler;
use crate::store::ReminderStore;

/// Lifecycle state of the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl GuardState {
    fn from_u8(v: u8) -> GuardState {
        match v {
            1 => GuardState::Starting,
            2 => GuardState::Running,
            3 => GuardState::Stopping,
            _ => GuardState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            GuardState::Stopped => 0,
            GuardState::Starting => 1,
            GuardState::Running => 2,
            GuardState::Stopping => 3,
        }
    }
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GuardState::Stopped => "stopped",
            GuardState::Starting => "starting",
            GuardState::Running => "running",
            GuardState::Stopping => "stopping",
        };
        write!(f, "{s}")
    }
}

/// Host process lifecycle hooks.
#[async_trait]
pub trait HostLifecycle: Send + Sync {
    /// Resolves when the host tears the background presence down
    /// involuntarily. Called repeatedly: each resolution is one teardown.
    async fn torn_down(&self);

    /// Ask the host to bring the presence back after a teardown.
    fn request_restart(&self);
}

/// Host adapter for environments without teardown signals: the presence
/// simply never dies.
pub struct SteadyHost;

#[async_trait]
impl HostLifecycle for SteadyHost {
    async fn torn_down(&self) {
        std::future::pending::<()>().await;
    }

    fn request_restart(&self) {}
}

/// Self-supervising presence that re-arms the scheduler.
pub struct KeepAliveGuard {
    store: Arc<dyn ReminderStore>,
    scheduler: Arc<DualPathScheduler>,
    presenter: Arc<dyn AlarmPresenter>,
    host: Arc<dyn HostLifecycle>,
    events: EventSender,
    config: EngineConfig,
    owner_id: String,
    /// Single mutation point for the lifecycle state.
    state: AtomicU8,
    stop: Notify,
    restarts: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl KeepAliveGuard {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ReminderStore>,
        scheduler: Arc<DualPathScheduler>,
        presenter: Arc<dyn AlarmPresenter>,
        host: Arc<dyn HostLifecycle>,
        events: EventSender,
        config: EngineConfig,
        owner_id: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            scheduler,
            presenter,
            host,
            events,
            config,
            owner_id: owner_id.into(),
            state: AtomicU8::new(GuardState::Stopped.as_u8()),
            stop: Notify::new(),
            restarts: AtomicU64::new(0),
            task: Mutex::new(None),
        })
    }

    pub fn state(&self) -> GuardState {
        GuardState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, next: GuardState) {
        self.state.store(next.as_u8(), Ordering::Release);
    }

    /// Restarts performed after involuntary teardowns, cumulative.
    pub fn restart_count(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Start the supervision loop and perform the initial rearm.
    pub async fn start(self: Arc<Self>) -> Result<(), GuardError> {
        let stopped = GuardState::Stopped.as_u8();
        let starting = GuardState::Starting.as_u8();
        if self
            .state
            .compare_exchange(stopped, starting, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GuardError::AlreadyRunning {
                state: self.state().to_string(),
            });
        }

        let this = Arc::clone(&self);
        let handle = tokio::spawn(async move { this.run().await });
        *self.task.lock().await = Some(handle);
        tracing::info!(owner_id = %self.owner_id, "Keep-alive guard starting");
        Ok(())
    }

    /// Intentional shutdown. Never triggers a self-restart.
    pub async fn stop(&self) {
        if self.state() == GuardState::Stopped {
            return;
        }
        self.stop.notify_one();
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            self.rearm().await;
            self.set_state(GuardState::Running);

            tokio::select! {
                _ = self.stop.notified() => {
                    self.set_state(GuardState::Stopping);
                    tracing::info!("Keep-alive guard stopped on request");
                    self.set_state(GuardState::Stopped);
                    return;
                }
                _ = self.host.torn_down() => {
                    let restarts = self.restarts.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(restarts, "Presence torn down unexpectedly, restarting");
                    self.host.request_restart();
                    events::emit(&self.events, EngineEvent::GuardRestarted { restarts });

                    // A stop during the backoff still wins over the restart.
                    tokio::select! {
                        _ = self.stop.notified() => {
                            self.set_state(GuardState::Stopping);
                            tracing::info!("Keep-alive guard stopped during restart backoff");
                            self.set_state(GuardState::Stopped);
                            return;
                        }
                        _ = tokio::time::sleep(self.config.restart_delay) => {}
                    }
                }
            }
        }
    }

    /// Fetch the active set and re-establish the armed-pair invariant.
    async fn rearm(&self) {
        let reminders = match self.store.get_active_reminders(&self.owner_id).await {
            Ok(reminders) => reminders,
            Err(e) => {
                // Previously-armed in-memory timers remain valid; try again
                // at the next restart opportunity.
                tracing::warn!("Store unavailable at rearm, will retry: {}", e);
                return;
            }
        };

        let report = self.scheduler.schedule_all_active(reminders).await;

        for advanced in &report.advanced {
            if let Err(e) = self.store.update_reminder(advanced).await {
                tracing::warn!(
                    reminder_id = %advanced.id,
                    "Could not persist advanced recurrence: {}", e
                );
            }
        }

        self.missed_pass(report.missed).await;
    }

    /// Surface and retire one-shot reminders whose time passed unarmed.
    async fn missed_pass(&self, missed: Vec<crate::reminder::Reminder>) {
        let now = now_millis();
        let window = self.config.missed_window.as_millis() as i64;

        for mut reminder in missed {
            tracing::info!(reminder_id = %reminder.id, "Reminder was missed");
            events::emit(
                &self.events,
                EngineEvent::Missed {
                    id: reminder.id.clone(),
                },
            );

            let age = now - reminder.trigger_time;
            if self.config.notify_missed && age <= window {
                self.presenter
                    .present_quiet(
                        &format!("[Missed] {}", reminder.title),
                        &reminder.description,
                    )
                    .await;
            }

            // Retire it so the next rearm does not flag it again.
            reminder.active = false;
            reminder.touch();
            if let Err(e) = self.store.update_reminder(&reminder).await {
                tracing::warn!(
                    reminder_id = %reminder.id,
                    "Could not retire missed reminder: {}", e
                );
            }
        }
    }
}
