//! Delivery trigger funnel.
//!
//! Every timer fire — from either backend — passes through here before a
//! reminder is presented. The funnel de-duplicates the double-fire case,
//! drops fires for reminders that were deactivated or deleted after arming,
//! and acquires the exclusive wake resource before handing off to the
//! alarm controller.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::alarm::AlarmController;
use crate::events::{self, EngineEvent, EventSender};
use crate::scheduler::TimerFire;
use crate::store::ReminderStore;
use crate::wake::WakeSource;

/// Bounded set of already-accepted `(reminder_id, trigger_time)` keys.
///
/// Insertion order doubles as the eviction order; the bound only matters
/// once the redundant fire has long since arrived, so evicting the oldest
/// key is safe.
struct DedupSet {
    keys: HashSet<(String, i64)>,
    order: VecDeque<(String, i64)>,
    capacity: usize,
}

impl DedupSet {
    fn new(capacity: usize) -> Self {
        Self {
            keys: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert the key; `false` means it was already present.
    fn insert(&mut self, key: (String, i64)) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.insert(key.clone());
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        true
    }
}

/// Single funnel from timer expiry to alarm presentation.
pub struct TriggerHandler {
    store: Arc<dyn ReminderStore>,
    wake: Arc<WakeSource>,
    alarms: Arc<AlarmController>,
    events: EventSender,
    seen: Mutex<DedupSet>,
}

impl TriggerHandler {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        wake: Arc<WakeSource>,
        alarms: Arc<AlarmController>,
        events: EventSender,
        dedup_capacity: usize,
    ) -> Self {
        Self {
            store,
            wake,
            alarms,
            events,
            seen: Mutex::new(DedupSet::new(dedup_capacity)),
        }
    }

    /// Spawn the dispatch loop consuming fires from both backends.
    pub fn spawn_dispatch(self: Arc<Self>, mut fires: mpsc::Receiver<TimerFire>) -> JoinHandle<()> {
        let this = self;
        tokio::spawn(async move {
            while let Some(fire) = fires.recv().await {
                let handler = Arc::clone(&this);
                tokio::spawn(async move {
                    handler.handle_fire(fire).await;
                });
            }
            tracing::debug!("Fire channel closed, dispatch loop exiting");
        })
    }

    /// Process one timer expiry.
    pub async fn handle_fire(&self, fire: TimerFire) {
        let key = (fire.reminder.id.clone(), fire.trigger_time);
        // Atomic check-and-insert: the losing backend's fire stops here.
        if !self.seen.lock().await.insert(key) {
            tracing::debug!(
                reminder_id = %fire.reminder.id,
                path = %fire.path,
                "Duplicate fire dropped"
            );
            return;
        }

        tracing::info!(
            reminder_id = %fire.reminder.id,
            path = %fire.path,
            trigger_time = fire.trigger_time,
            "Reminder triggered"
        );
        events::emit(
            &self.events,
            EngineEvent::Triggered {
                id: fire.reminder.id.clone(),
                trigger_time: fire.trigger_time,
            },
        );

        // The record may have been edited, deactivated, or deleted since the
        // timer was armed; re-read before ringing. A store failure is not a
        // reason to stay silent — present the armed payload instead.
        let reminder = match self.store.get_reminder(&fire.reminder.id).await {
            Ok(Some(current)) => {
                if !current.active {
                    tracing::info!(
                        reminder_id = %current.id,
                        "Reminder deactivated since arming, skipping"
                    );
                    events::emit(
                        &self.events,
                        EngineEvent::Skipped {
                            id: current.id,
                            reason: "deactivated".to_string(),
                        },
                    );
                    return;
                }
                current
            }
            Ok(None) => {
                tracing::info!(
                    reminder_id = %fire.reminder.id,
                    "Reminder deleted since arming, skipping"
                );
                events::emit(
                    &self.events,
                    EngineEvent::Skipped {
                        id: fire.reminder.id,
                        reason: "deleted".to_string(),
                    },
                );
                return;
            }
            Err(e) => {
                tracing::warn!(
                    reminder_id = %fire.reminder.id,
                    "Could not verify reminder before presenting: {}", e
                );
                fire.reminder
            }
        };

        let wake = self.wake.acquire().await;
        self.alarms.present(reminder, wake).await;
    }
}
