//! Reminder store trait.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::reminder::Reminder;

/// Backend-agnostic persistence boundary for reminder records.
///
/// The engine never owns reminder CRUD. It reads the active set at guard
/// rearm time, re-reads single records before presenting, and writes back
/// `active`/`completed` flips and recurrence advances after a trigger
/// resolves. `update_reminder` has upsert semantics: snooze clones are
/// persisted through it under their engine-minted ids.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// All active reminders owned by `owner_id`.
    async fn get_active_reminders(&self, owner_id: &str) -> Result<Vec<Reminder>, StoreError>;

    /// A single reminder by id, `None` if it no longer exists.
    async fn get_reminder(&self, id: &str) -> Result<Option<Reminder>, StoreError>;

    /// Insert or replace a reminder record.
    async fn update_reminder(&self, reminder: &Reminder) -> Result<(), StoreError>;
}
