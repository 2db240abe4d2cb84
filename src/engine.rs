//! Engine assembly.
//!
//! Wires the backends, funnel, controller, and guard together behind one
//! constructor so embedders only supply the three boundary implementations:
//! the store, the presentation surface, and the host lifecycle hooks.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::alarm::{AlarmController, AlarmPresenter};
use crate::config::EngineConfig;
use crate::error::GuardError;
use crate::events::{EngineEvent, EventSender};
use crate::guard::{HostLifecycle, KeepAliveGuard};
use crate::scheduler::{DelayQueue, DualPathScheduler, ExactTimers};
use crate::store::ReminderStore;
use crate::trigger::TriggerHandler;
use crate::wake::WakeSource;

/// Boundary implementations supplied by the embedder.
pub struct EngineDeps {
    pub store: Arc<dyn ReminderStore>,
    pub presenter: Arc<dyn AlarmPresenter>,
    pub host: Arc<dyn HostLifecycle>,
}

/// The assembled reminder engine.
pub struct ReminderEngine {
    scheduler: Arc<DualPathScheduler>,
    exact: Arc<ExactTimers>,
    guard: Arc<KeepAliveGuard>,
    events: EventSender,
    dispatch: JoinHandle<()>,
}

impl ReminderEngine {
    pub fn new(config: EngineConfig, deps: EngineDeps, owner_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        let (fire_tx, fire_rx) = mpsc::channel(config.fire_channel_capacity);

        let exact = Arc::new(ExactTimers::new(fire_tx.clone()));
        let queue = Arc::new(DelayQueue::new(fire_tx, config.queue_tick));
        let scheduler = Arc::new(DualPathScheduler::new(
            exact.clone(),
            queue,
            events.clone(),
        ));

        let wake = Arc::new(WakeSource::new());
        let alarms = Arc::new(AlarmController::new(
            deps.presenter.clone(),
            scheduler.clone(),
            deps.store.clone(),
            events.clone(),
            config.auto_dismiss,
        ));
        let trigger = Arc::new(TriggerHandler::new(
            deps.store.clone(),
            wake,
            alarms,
            events.clone(),
            config.dedup_capacity,
        ));
        let dispatch = trigger.spawn_dispatch(fire_rx);

        let guard = KeepAliveGuard::new(
            deps.store,
            scheduler.clone(),
            deps.presenter,
            deps.host,
            events.clone(),
            config,
            owner_id,
        );

        Self {
            scheduler,
            exact,
            guard,
            events,
            dispatch,
        }
    }

    /// Start the keep-alive guard, arming every active reminder.
    pub async fn start(&self) -> Result<(), GuardError> {
        self.guard.clone().start().await
    }

    /// Intentional shutdown of the guard. Armed timers are left in place.
    pub async fn stop(&self) {
        self.guard.stop().await;
    }

    /// Subscribe to the engine's event broadcast.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn scheduler(&self) -> &Arc<DualPathScheduler> {
        &self.scheduler
    }

    /// The exact-timer path, exposed so embedders can reflect the
    /// platform's precise-timer permission.
    pub fn exact_timers(&self) -> &Arc<ExactTimers> {
        &self.exact
    }

    pub fn guard(&self) -> &Arc<KeepAliveGuard> {
        &self.guard
    }
}

impl Drop for ReminderEngine {
    fn drop(&mut self) {
        self.dispatch.abort();
    }
}
