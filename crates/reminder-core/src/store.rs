//! Storage boundary for the lifecycle engine.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::error::{ReminderError, Result};
use crate::types::{Owner, Reminder};

/// Options for [`ReminderStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Run [`Reminder::validate`] before writing. Flag and date updates made
    /// by the scheduler pass `false` so unrelated field constraints (a title
    /// that no longer fits, a target date now inside 24h) cannot block them.
    pub validate: bool,
}

impl SaveOptions {
    pub const VALIDATED: Self = Self { validate: true };
    pub const UNVALIDATED: Self = Self { validate: false };
}

/// A stored reminder row that could not be decoded. It stays in the store
/// untouched until someone repairs or removes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableRecord {
    pub id: Uuid,
    /// Best-effort title pulled from the raw row, if it had one.
    pub title: Option<String>,
    pub reason: String,
}

/// Everything one [`ReminderStore::fetch_all`] call found.
#[derive(Debug, Default)]
pub struct Fetched {
    pub reminders: Vec<Reminder>,
    pub unreadable: Vec<UnreadableRecord>,
}

/// Persistent reminder collection.
///
/// Implementations are synchronous; async callers run them on a blocking
/// thread.
pub trait ReminderStore: Send + Sync {
    /// Every reminder, with `owner` resolved where the owner exists and
    /// decodes. Rows that do not decode are listed in
    /// [`Fetched::unreadable`] instead of failing the whole call.
    fn fetch_all(&self) -> Result<Fetched>;

    /// Remove a reminder. Returns `false` if it was already gone.
    fn delete(&self, id: Uuid) -> Result<bool>;

    /// Insert or replace a reminder by id.
    fn save(&self, reminder: &Reminder, opts: SaveOptions) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    /// Insertion order is the fetch order.
    reminders: Vec<Reminder>,
    owners: HashMap<Uuid, Owner>,
}

/// In-process store for tests and manual harnesses. Fetch order is insertion
/// order.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|e| ReminderError::Store(format!("memory store poisoned: {e}")))
    }

    pub fn add_owner(&self, owner: Owner) -> Result<()> {
        self.lock()?.owners.insert(owner.id, owner);
        Ok(())
    }

    /// Snapshot of one reminder as stored (owner unresolved).
    pub fn get(&self, id: Uuid) -> Result<Option<Reminder>> {
        Ok(self.lock()?.reminders.iter().find(|r| r.id == id).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.reminders.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl ReminderStore for MemoryStore {
    fn fetch_all(&self) -> Result<Fetched> {
        let inner = self.lock()?;
        let reminders = inner
            .reminders
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r.owner = inner.owners.get(&r.owner_id).cloned();
                r
            })
            .collect();
        Ok(Fetched {
            reminders,
            unreadable: Vec::new(),
        })
    }

    fn delete(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.reminders.len();
        inner.reminders.retain(|r| r.id != id);
        Ok(inner.reminders.len() != before)
    }

    fn save(&self, reminder: &Reminder, opts: SaveOptions) -> Result<()> {
        if opts.validate {
            reminder.validate()?;
        }
        let mut stored = reminder.clone();
        stored.owner = None;

        let mut inner = self.lock()?;
        match inner.reminders.iter_mut().find(|r| r.id == reminder.id) {
            Some(slot) => *slot = stored,
            None => inner.reminders.push(stored),
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample(owner: &Owner, title: &str) -> Reminder {
        Reminder::new(title, Utc::now() + Duration::days(5), owner.id, false)
    }

    #[test]
    fn fetch_resolves_owner_and_keeps_order() {
        let store = MemoryStore::new();
        let owner = Owner::new("Ada", "ada@example.com");
        store.add_owner(owner.clone()).unwrap();

        let a = sample(&owner, "First");
        let b = Reminder::new("Orphan", Utc::now() + Duration::days(5), Uuid::new_v4(), false);
        store.save(&a, SaveOptions::VALIDATED).unwrap();
        store.save(&b, SaveOptions::VALIDATED).unwrap();

        let all = store.fetch_all().unwrap().reminders;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "First");
        assert_eq!(all[0].owner.as_ref(), Some(&owner));
        assert!(all[1].owner.is_none());
    }

    #[test]
    fn save_replaces_by_id() {
        let store = MemoryStore::new();
        let owner = Owner::new("Ada", "ada@example.com");
        let mut r = sample(&owner, "Dentist");
        store.save(&r, SaveOptions::VALIDATED).unwrap();
        r.progress.week = true;
        store.save(&r, SaveOptions::UNVALIDATED).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        assert!(store.get(r.id).unwrap().unwrap().progress.week);
    }

    #[test]
    fn validating_save_rejects_and_unvalidated_accepts() {
        let store = MemoryStore::new();
        let owner = Owner::new("Ada", "ada@example.com");
        let mut r = sample(&owner, "Dentist");
        r.target_date = Some(Utc::now() - Duration::days(1));

        assert!(store.save(&r, SaveOptions::VALIDATED).is_err());
        assert!(store.is_empty().unwrap());
        store.save(&r, SaveOptions::UNVALIDATED).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn delete_reports_presence() {
        let store = MemoryStore::new();
        let owner = Owner::new("Ada", "ada@example.com");
        let r = sample(&owner, "Dentist");
        store.save(&r, SaveOptions::VALIDATED).unwrap();
        assert!(store.delete(r.id).unwrap());
        assert!(!store.delete(r.id).unwrap());
    }
}
