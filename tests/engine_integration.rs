//! Integration tests for the reminder engine.
//!
//! Each test assembles the real engine — dual-path scheduler, trigger
//! funnel, alarm controller, keep-alive guard — around in-memory fakes for
//! the store, the presentation surface, and the host lifecycle, then drives
//! it with short real-time delays.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use reminder_engine::alarm::{AlarmHandle, AlarmPresenter, AlarmView};
use reminder_engine::error::StoreError;
use reminder_engine::guard::{GuardState, HostLifecycle};
use reminder_engine::reminder::now_millis;
use reminder_engine::scheduler::ScheduleOutcome;
use reminder_engine::store::{MemoryStore, ReminderStore};
use reminder_engine::{EngineConfig, EngineDeps, Reminder, ReminderEngine, RepeatMode};

/// Maximum time any polled condition may take before the test is hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Presenter that parks alarm handles so tests resolve them explicitly.
#[derive(Default)]
struct ScriptedPresenter {
    handles: Mutex<Vec<AlarmHandle>>,
    alarm_count: AtomicUsize,
    quiet_titles: Mutex<Vec<String>>,
}

#[async_trait]
impl AlarmPresenter for ScriptedPresenter {
    async fn present_alarm(&self, _view: AlarmView, handle: AlarmHandle) {
        self.alarm_count.fetch_add(1, Ordering::SeqCst);
        self.handles.lock().await.push(handle);
    }

    async fn present_quiet(&self, title: &str, _body: &str) {
        self.quiet_titles.lock().await.push(title.to_string());
    }
}

impl ScriptedPresenter {
    async fn wait_handle(&self) -> AlarmHandle {
        let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
        loop {
            if let Some(handle) = self.handles.lock().await.pop() {
                return handle;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "no alarm was presented within the timeout"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Store whose reads can be switched to fail, for outage scenarios.
struct FlakyStore {
    inner: MemoryStore,
    fail: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReminderStore for FlakyStore {
    async fn get_active_reminders(&self, owner_id: &str) -> Result<Vec<Reminder>, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        self.inner.get_active_reminders(owner_id).await
    }

    async fn get_reminder(&self, id: &str) -> Result<Option<Reminder>, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".to_string()));
        }
        self.inner.get_reminder(id).await
    }

    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StoreError> {
        self.inner.update_reminder(reminder).await
    }
}

/// Host whose teardowns are injected by the test.
#[derive(Default)]
struct TestHost {
    teardown: Notify,
    restart_requests: AtomicU64,
}

impl TestHost {
    fn tear_down(&self) {
        self.teardown.notify_one();
    }
}

#[async_trait]
impl HostLifecycle for TestHost {
    async fn torn_down(&self) {
        self.teardown.notified().await;
    }

    fn request_restart(&self) {
        self.restart_requests.fetch_add(1, Ordering::SeqCst);
    }
}

fn test_config() -> EngineConfig {
    EngineConfig {
        queue_tick: Duration::from_millis(25),
        restart_delay: Duration::from_millis(30),
        ..EngineConfig::default()
    }
}

struct Harness {
    engine: ReminderEngine,
    store: Arc<MemoryStore>,
    presenter: Arc<ScriptedPresenter>,
    host: Arc<TestHost>,
}

fn harness(config: EngineConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let presenter = Arc::new(ScriptedPresenter::default());
    let host = Arc::new(TestHost::default());
    let engine = ReminderEngine::new(
        config,
        EngineDeps {
            store: store.clone(),
            presenter: presenter.clone(),
            host: host.clone(),
        },
        "u1",
    );
    Harness {
        engine,
        store,
        presenter,
        host,
    }
}

async fn wait_for<F, Fut>(what: &str, mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    loop {
        if cond().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for: {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn soon(id: &str, millis_from_now: i64) -> Reminder {
    Reminder::new(id, "u1", "Stand up", "Stretch", now_millis() + millis_from_now)
}

#[tokio::test]
async fn double_fire_presents_exactly_once() {
    let h = harness(test_config());
    h.store.insert(soon("r1", 120)).await;
    h.engine.start().await.unwrap();

    // Let both the exact task and at least two queue ticks pass.
    let handle = h.presenter.wait_handle().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.presenter.alarm_count.load(Ordering::SeqCst), 1);

    handle.dismiss();
    h.engine.stop().await;
}

#[tokio::test]
async fn daily_dismiss_advances_recurrence_and_rearms() {
    let h = harness(test_config());
    let mut reminder = soon("r1", 120);
    reminder.repeat_mode = RepeatMode::Daily;
    let old_trigger = reminder.trigger_time;
    h.store.insert(reminder).await;
    h.engine.start().await.unwrap();

    h.presenter.wait_handle().await.dismiss();

    let store = h.store.clone();
    wait_for("store to hold the advanced occurrence", || {
        let store = store.clone();
        async move {
            match store.get_reminder("r1").await.unwrap() {
                Some(r) => r.active && r.trigger_time > now_millis(),
                None => false,
            }
        }
    })
    .await;

    let advanced = h.store.get_reminder("r1").await.unwrap().unwrap();
    let delta = advanced.trigger_time - old_trigger;
    // One calendar day later (22-26h bracket tolerates DST).
    assert!(delta >= 22 * 3_600_000 && delta <= 26 * 3_600_000, "delta {delta}");

    let scheduler = h.engine.scheduler().clone();
    wait_for("new timer pair for the next occurrence", || {
        let scheduler = scheduler.clone();
        async move { scheduler.armed_paths("r1").await == (true, true) }
    })
    .await;
    h.engine.stop().await;
}

#[tokio::test]
async fn oneshot_dismiss_deactivates_and_disarms() {
    let h = harness(test_config());
    h.store.insert(soon("r1", 120)).await;
    h.engine.start().await.unwrap();

    h.presenter.wait_handle().await.dismiss();

    let store = h.store.clone();
    wait_for("store to deactivate the reminder", || {
        let store = store.clone();
        async move {
            store
                .get_reminder("r1")
                .await
                .unwrap()
                .is_some_and(|r| !r.active)
        }
    })
    .await;

    let scheduler = h.engine.scheduler().clone();
    wait_for("both paths disarmed", || {
        let scheduler = scheduler.clone();
        async move { scheduler.armed_paths("r1").await == (false, false) }
    })
    .await;
    h.engine.stop().await;
}

#[tokio::test]
async fn snooze_defers_without_shifting_the_chain() {
    let h = harness(test_config());
    let mut reminder = soon("r1", 120);
    reminder.repeat_mode = RepeatMode::Daily;
    reminder.snooze_minutes = 1;
    let old_trigger = reminder.trigger_time;
    h.store.insert(reminder).await;
    h.engine.start().await.unwrap();

    h.presenter.wait_handle().await.snooze();

    let store = h.store.clone();
    wait_for("snooze clone to be persisted", || {
        let store = store.clone();
        async move {
            store
                .all()
                .await
                .iter()
                .any(|r| r.id.starts_with("snooze-"))
        }
    })
    .await;

    let all = h.store.all().await;
    let clone = all.iter().find(|r| r.id.starts_with("snooze-")).unwrap();
    assert_eq!(clone.repeat_mode, RepeatMode::None);
    let defer = clone.trigger_time - now_millis();
    assert!(defer > 50_000 && defer <= 60_000, "defer {defer}");

    // The source's repeat-derived next occurrence is what a dismiss would
    // have produced — one day after the original trigger, not the snooze.
    let source = all.iter().find(|r| r.id == "r1").unwrap();
    assert_eq!(source.repeat_mode, RepeatMode::Daily);
    let delta = source.trigger_time - old_trigger;
    assert!(delta >= 22 * 3_600_000 && delta <= 26 * 3_600_000, "delta {delta}");

    let (exact_clone, queue_clone) = h.engine.scheduler().armed_paths(&clone.id).await;
    assert!(exact_clone && queue_clone);
    let (exact_src, queue_src) = h.engine.scheduler().armed_paths("r1").await;
    assert!(exact_src && queue_src);
    h.engine.stop().await;
}

#[tokio::test]
async fn unexpected_teardown_restarts_and_rearms() {
    let h = harness(test_config());
    h.store.insert(soon("r1", 10_000)).await;
    h.engine.start().await.unwrap();

    let scheduler = h.engine.scheduler().clone();
    wait_for("initial rearm", || {
        let scheduler = scheduler.clone();
        async move { scheduler.armed_paths("r1").await.0 }
    })
    .await;

    // A record created while the engine was down gets armed by the restart.
    h.store.insert(soon("r2", 10_000)).await;
    h.host.tear_down();

    let guard = h.engine.guard().clone();
    let scheduler = h.engine.scheduler().clone();
    wait_for("restart to rearm the new reminder", || {
        let scheduler = scheduler.clone();
        async move { scheduler.armed_paths("r2").await.0 }
    })
    .await;
    assert_eq!(guard.restart_count(), 1);
    assert_eq!(h.host.restart_requests.load(Ordering::SeqCst), 1);

    h.engine.stop().await;
}

#[tokio::test]
async fn intentional_stop_never_self_restarts() {
    let h = harness(test_config());
    h.store.insert(soon("r1", 10_000)).await;
    h.engine.start().await.unwrap();

    h.engine.stop().await;
    assert_eq!(h.engine.guard().state(), GuardState::Stopped);
    assert_eq!(h.engine.guard().restart_count(), 0);

    // Teardown signals after a stop must be ignored.
    h.store.insert(soon("r2", 10_000)).await;
    h.host.tear_down();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.engine.guard().restart_count(), 0);
    assert_eq!(h.host.restart_requests.load(Ordering::SeqCst), 0);
    assert_eq!(h.engine.scheduler().armed_paths("r2").await, (false, false));
}

#[tokio::test]
async fn store_outage_at_rearm_recovers_on_next_restart() {
    let store = Arc::new(FlakyStore::new());
    let presenter = Arc::new(ScriptedPresenter::default());
    let host = Arc::new(TestHost::default());
    let engine = ReminderEngine::new(
        test_config(),
        EngineDeps {
            store: store.clone(),
            presenter,
            host: host.clone(),
        },
        "u1",
    );

    store.inner.insert(soon("r1", 10_000)).await;
    store.set_failing(true);
    engine.start().await.unwrap();

    let guard = engine.guard().clone();
    wait_for("guard running despite the outage", || {
        let guard = guard.clone();
        async move { guard.state() == GuardState::Running }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(engine.scheduler().armed_paths("r1").await, (false, false));

    // Outage ends; the next restart opportunity re-establishes the invariant.
    store.set_failing(false);
    host.tear_down();
    let scheduler = engine.scheduler().clone();
    wait_for("rearm after the outage", || {
        let scheduler = scheduler.clone();
        async move { scheduler.armed_paths("r1").await == (true, true) }
    })
    .await;
    engine.stop().await;
}

#[tokio::test]
async fn missed_oneshot_is_surfaced_and_retired() {
    let config = EngineConfig {
        notify_missed: true,
        ..test_config()
    };
    let h = harness(config);
    let mut missed = soon("r1", 0);
    missed.trigger_time = now_millis() - 3_600_000;
    h.store.insert(missed).await;
    h.engine.start().await.unwrap();

    let presenter = h.presenter.clone();
    wait_for("missed notification", || {
        let presenter = presenter.clone();
        async move {
            presenter
                .quiet_titles
                .lock()
                .await
                .iter()
                .any(|t| t.starts_with("[Missed]"))
        }
    })
    .await;

    let store = h.store.clone();
    wait_for("missed reminder retired", || {
        let store = store.clone();
        async move {
            store
                .get_reminder("r1")
                .await
                .unwrap()
                .is_some_and(|r| !r.active)
        }
    })
    .await;
    assert_eq!(h.engine.scheduler().armed_paths("r1").await, (false, false));
    h.engine.stop().await;
}

#[tokio::test]
async fn missed_notifications_default_off() {
    let h = harness(test_config());
    let mut missed = soon("r1", 0);
    missed.trigger_time = now_millis() - 3_600_000;
    h.store.insert(missed).await;
    h.engine.start().await.unwrap();

    let store = h.store.clone();
    wait_for("missed reminder retired silently", || {
        let store = store.clone();
        async move {
            store
                .get_reminder("r1")
                .await
                .unwrap()
                .is_some_and(|r| !r.active)
        }
    })
    .await;
    assert!(h.presenter.quiet_titles.lock().await.is_empty());
    h.engine.stop().await;
}

#[tokio::test]
async fn denied_exact_path_degrades_but_still_delivers() {
    let h = harness(test_config());
    h.engine.exact_timers().set_allowed(false);

    let reminder = soon("r1", 100);
    h.store.insert(reminder.clone()).await;

    let mut events = h.engine.subscribe();
    let outcome = h.engine.scheduler().schedule(&reminder).await.unwrap();
    assert!(matches!(outcome, ScheduleOutcome::Degraded { .. }));

    // The degraded-mode signal reaches telemetry.
    let mut saw_degraded = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, reminder_engine::events::EngineEvent::Degraded { .. }) {
            saw_degraded = true;
        }
    }
    assert!(saw_degraded);

    // The queue path alone still rings the alarm.
    let handle = h.presenter.wait_handle().await;
    handle.dismiss();
}
