//! In-memory store backend.
//!
//! Ships for the demo binary and tests; a production embedding supplies its
//! own [`ReminderStore`] over the real database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::reminder::Reminder;
use crate::store::traits::ReminderStore;

/// A `ReminderStore` backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Reminder>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the trait.
    pub async fn insert(&self, reminder: Reminder) {
        self.records
            .write()
            .await
            .insert(reminder.id.clone(), reminder);
    }

    /// Snapshot of every record, for inspection.
    pub async fn all(&self) -> Vec<Reminder> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn get_active_reminders(&self, owner_id: &str) -> Result<Vec<Reminder>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.owner_id == owner_id && r.active)
            .cloned()
            .collect())
    }

    async fn get_reminder(&self, id: &str) -> Result<Option<Reminder>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(reminder.id.clone(), reminder.clone());
        Ok(())
    }
}
