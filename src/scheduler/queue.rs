//! Durable delayed-task queue path.
//!
//! Poll-based: a ticker drains due entries once per tick, so delivery lags
//! the target instant by up to one tick. The platform facility this adapts
//! persists its queue across process restarts on its own; in-process it is
//! the hedge against the exact path being silently dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::error::ScheduleError;
use crate::reminder::{Reminder, now_millis};
use crate::scheduler::backend::{TimerBackend, TimerFire, TimerPath};

struct QueueEntry {
    fire_at: i64,
    reminder: Reminder,
}

pub struct DelayQueue {
    entries: Arc<Mutex<HashMap<String, QueueEntry>>>,
    ticker: JoinHandle<()>,
}

impl DelayQueue {
    pub fn new(fires: mpsc::Sender<TimerFire>, tick: Duration) -> Self {
        let entries: Arc<Mutex<HashMap<String, QueueEntry>>> = Arc::new(Mutex::new(HashMap::new()));

        let poll = Arc::clone(&entries);
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            // Skip immediate first tick
            interval.tick().await;

            loop {
                interval.tick().await;
                let now = now_millis();
                let due: Vec<TimerFire> = {
                    let mut entries = poll.lock().await;
                    let ids: Vec<String> = entries
                        .iter()
                        .filter(|(_, entry)| entry.fire_at <= now)
                        .map(|(id, _)| id.clone())
                        .collect();
                    ids.into_iter()
                        .filter_map(|id| entries.remove(&id))
                        .map(|entry| TimerFire {
                            trigger_time: entry.fire_at,
                            reminder: entry.reminder,
                            path: TimerPath::Queue,
                        })
                        .collect()
                };

                for fire in due {
                    let id = fire.reminder.id.clone();
                    if fires.send(fire).await.is_err() {
                        tracing::warn!(
                            reminder_id = %id,
                            "Fire channel closed, dropping queued task"
                        );
                        return;
                    }
                }
            }
        });

        Self { entries, ticker }
    }
}

impl Drop for DelayQueue {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

#[async_trait]
impl TimerBackend for DelayQueue {
    fn name(&self) -> &'static str {
        "queue"
    }

    async fn arm(&self, id: &str, fire_at: i64, payload: Reminder) -> Result<(), ScheduleError> {
        self.entries.lock().await.insert(
            id.to_string(),
            QueueEntry {
                fire_at,
                reminder: payload,
            },
        );
        tracing::debug!(reminder_id = %id, fire_at, "Delayed task enqueued");
        Ok(())
    }

    async fn disarm(&self, id: &str) {
        if self.entries.lock().await.remove(id).is_some() {
            tracing::debug!(reminder_id = %id, "Delayed task cancelled");
        }
    }

    async fn is_armed(&self, id: &str) -> bool {
        self.entries.lock().await.contains_key(id)
    }
}
