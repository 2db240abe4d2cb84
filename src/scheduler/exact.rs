//! Precise one-shot timer path.
//!
//! One spawned task per armed id, sleeping until the fire instant. Models
//! the platform's exact-alarm facility including its permission gate: when
//! the platform revokes precise timers, `arm` fails with `Denied` and the
//! scheduler degrades to the queue path alone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::error::ScheduleError;
use crate::reminder::{Reminder, now_millis};
use crate::scheduler::backend::{TimerBackend, TimerFire, TimerPath};

pub struct ExactTimers {
    fires: mpsc::Sender<TimerFire>,
    armed: Mutex<HashMap<String, JoinHandle<()>>>,
    allowed: AtomicBool,
}

impl ExactTimers {
    pub fn new(fires: mpsc::Sender<TimerFire>) -> Self {
        Self {
            fires,
            armed: Mutex::new(HashMap::new()),
            allowed: AtomicBool::new(true),
        }
    }

    /// Model the platform granting or revoking the precise-timer permission.
    pub fn set_allowed(&self, allowed: bool) {
        self.allowed.store(allowed, Ordering::Release);
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl TimerBackend for ExactTimers {
    fn name(&self) -> &'static str {
        "exact"
    }

    async fn arm(&self, id: &str, fire_at: i64, payload: Reminder) -> Result<(), ScheduleError> {
        if !self.is_allowed() {
            return Err(ScheduleError::Denied {
                backend: self.name(),
                id: id.to_string(),
                reason: "precise timers not permitted".to_string(),
            });
        }

        let mut armed = self.armed.lock().await;
        if let Some(old) = armed.remove(id) {
            old.abort();
        }

        let delay = Duration::from_millis((fire_at - now_millis()).max(0) as u64);
        let fire = TimerFire {
            reminder: payload,
            trigger_time: fire_at,
            path: TimerPath::Exact,
        };
        let tx = self.fires.clone();
        let task_id = id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(fire).await.is_err() {
                tracing::warn!(
                    reminder_id = %task_id,
                    "Fire channel closed, dropping exact timer expiry"
                );
            }
        });
        armed.insert(id.to_string(), handle);

        tracing::debug!(reminder_id = %id, delay_ms = delay.as_millis() as u64, "Exact timer armed");
        Ok(())
    }

    async fn disarm(&self, id: &str) {
        if let Some(handle) = self.armed.lock().await.remove(id) {
            handle.abort();
            tracing::debug!(reminder_id = %id, "Exact timer disarmed");
        }
    }

    async fn is_armed(&self, id: &str) -> bool {
        self.armed
            .lock()
            .await
            .get(id)
            .is_some_and(|handle| !handle.is_finished())
    }
}
