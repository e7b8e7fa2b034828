//! Persistent reminder store backed by redb.
//!
//! # Table design
//!
//! Two tables, both keyed by the 16 raw bytes of a UUID with JSON values:
//! ```text
//! reminders: reminder.id -> Reminder (owner not embedded)
//! owners:    owner.id    -> Owner
//! ```
//!
//! `fetch_all` reads both tables inside one read transaction so every
//! reminder is returned with its owner resolved against the same snapshot.
//! A reminder row that fails to decode is reported as unreadable and left in
//! place; an owner row that fails to decode leaves its reminders unresolved.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use uuid::Uuid;

use crate::error::{ReminderError, Result};
use crate::store::{Fetched, ReminderStore, SaveOptions, UnreadableRecord};
use crate::types::{Owner, Reminder};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const REMINDERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("reminders");
const OWNERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("owners");

fn db_err(e: impl std::fmt::Display) -> ReminderError {
    ReminderError::Store(e.to_string())
}

type Bytes = &'static [u8];

/// Look up and decode the owner for `owner_id`. A row that does not decode
/// is logged and treated as missing.
fn resolve_owner(
    owners: &redb::ReadOnlyTable<Bytes, Bytes>,
    owner_id: Uuid,
) -> Result<Option<Owner>> {
    let Some(raw) = owners.get(owner_id.as_bytes().as_slice()).map_err(db_err)? else {
        return Ok(None);
    };
    match serde_json::from_slice(raw.value()) {
        Ok(owner) => Ok(Some(owner)),
        Err(e) => {
            tracing::warn!(owner = %owner_id, "owner row unreadable: {e}");
            Ok(None)
        }
    }
}

fn unreadable(key: &[u8], raw: &[u8], reason: impl std::fmt::Display) -> UnreadableRecord {
    let title = serde_json::from_slice::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| v.get("title")?.as_str().map(str::to_string));
    UnreadableRecord {
        id: Uuid::from_slice(key).unwrap_or_else(|_| Uuid::nil()),
        title,
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// ReminderDb
// ---------------------------------------------------------------------------

pub struct ReminderDb {
    db: Database,
}

impl ReminderDb {
    /// Open or create the database at `path`, creating both tables if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        wt.open_table(REMINDERS).map_err(db_err)?;
        wt.open_table(OWNERS).map_err(db_err)?;
        wt.commit().map_err(db_err)?;
        tracing::debug!("opened reminder database at {}", path.display());
        Ok(Self { db })
    }

    /// Insert or replace an owner.
    pub fn save_owner(&self, owner: &Owner) -> Result<()> {
        let value = serde_json::to_vec(owner)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(OWNERS).map_err(db_err)?;
            table
                .insert(owner.id.as_bytes().as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    pub fn list_owners(&self) -> Result<Vec<Owner>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = rt.open_table(OWNERS).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            match serde_json::from_slice::<Owner>(v.value()) {
                Ok(owner) => result.push(owner),
                Err(e) => {
                    let id = Uuid::from_slice(k.value()).unwrap_or_else(|_| Uuid::nil());
                    tracing::warn!(owner = %id, "skipping unreadable owner row: {e}");
                }
            }
        }
        Ok(result)
    }

    /// Look up one reminder by id, owner resolved.
    pub fn get(&self, id: Uuid) -> Result<Option<Reminder>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let reminders = rt.open_table(REMINDERS).map_err(db_err)?;
        let owners = rt.open_table(OWNERS).map_err(db_err)?;

        let Some(raw) = reminders.get(id.as_bytes().as_slice()).map_err(db_err)? else {
            return Ok(None);
        };
        let mut reminder: Reminder = serde_json::from_slice(raw.value())?;
        reminder.owner = resolve_owner(&owners, reminder.owner_id)?;
        Ok(Some(reminder))
    }

    /// Delete every reminder, and every owner too when `owners` is set.
    /// Returns the number of reminders removed.
    pub fn purge(&self, owners: bool) -> Result<usize> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let removed;
        {
            let mut table = wt.open_table(REMINDERS).map_err(db_err)?;
            removed = clear_table(&mut table)?;
            if owners {
                let mut table = wt.open_table(OWNERS).map_err(db_err)?;
                clear_table(&mut table)?;
            }
        }
        wt.commit().map_err(db_err)?;
        tracing::info!(removed, owners, "purged reminder database");
        Ok(removed)
    }
}

fn clear_table(table: &mut redb::Table<'_, Bytes, Bytes>) -> Result<usize> {
    let mut keys = Vec::new();
    for entry in table.iter().map_err(db_err)? {
        let (k, _) = entry.map_err(db_err)?;
        keys.push(k.value().to_vec());
    }
    for key in &keys {
        table.remove(key.as_slice()).map_err(db_err)?;
    }
    Ok(keys.len())
}

impl ReminderStore for ReminderDb {
    fn fetch_all(&self) -> Result<Fetched> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let reminders = rt.open_table(REMINDERS).map_err(db_err)?;
        let owners = rt.open_table(OWNERS).map_err(db_err)?;

        let mut fetched = Fetched::default();
        for entry in reminders.iter().map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            let mut reminder: Reminder = match serde_json::from_slice(v.value()) {
                Ok(r) => r,
                Err(e) => {
                    let bad = unreadable(k.value(), v.value(), e);
                    tracing::warn!(reminder = %bad.id, "unreadable reminder row: {}", bad.reason);
                    fetched.unreadable.push(bad);
                    continue;
                }
            };
            reminder.owner = resolve_owner(&owners, reminder.owner_id)?;
            fetched.reminders.push(reminder);
        }
        Ok(fetched)
    }

    fn delete(&self, id: Uuid) -> Result<bool> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let existed;
        {
            let mut table = wt.open_table(REMINDERS).map_err(db_err)?;
            existed = table
                .remove(id.as_bytes().as_slice())
                .map_err(db_err)?
                .is_some();
        }
        wt.commit().map_err(db_err)?;
        Ok(existed)
    }

    fn save(&self, reminder: &Reminder, opts: SaveOptions) -> Result<()> {
        if opts.validate {
            reminder.validate()?;
        }
        let value = serde_json::to_vec(reminder)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(REMINDERS).map_err(db_err)?;
            table
                .insert(reminder.id.as_bytes().as_slice(), value.as_slice())
                .map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
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
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, ReminderDb) {
        let dir = TempDir::new().unwrap();
        let db = ReminderDb::open(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn reminder_for(owner: &Owner, title: &str, days: i64) -> Reminder {
        Reminder::new(title, Utc::now() + Duration::days(days), owner.id, false)
    }

    #[test]
    fn fetch_all_resolves_owners() {
        let (_dir, db) = open_tmp();
        let owner = Owner::new("Ada", "ada@example.com");
        db.save_owner(&owner).unwrap();
        let r = reminder_for(&owner, "Dentist", 5);
        db.save(&r, SaveOptions::VALIDATED).unwrap();

        let all = db.fetch_all().unwrap().reminders;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, r.id);
        assert_eq!(all[0].owner.as_ref().unwrap().email, "ada@example.com");
    }

    #[test]
    fn unknown_owner_stays_unresolved() {
        let (_dir, db) = open_tmp();
        let stranger = Owner::new("Ghost", "ghost@example.com");
        db.save(&reminder_for(&stranger, "Haunting", 5), SaveOptions::VALIDATED)
            .unwrap();

        let all = db.fetch_all().unwrap().reminders;
        assert!(all[0].owner.is_none());
    }

    #[test]
    fn save_overwrites_flags() {
        let (_dir, db) = open_tmp();
        let owner = Owner::new("Ada", "ada@example.com");
        let mut r = reminder_for(&owner, "Dentist", 5);
        db.save(&r, SaveOptions::VALIDATED).unwrap();

        r.progress.week = true;
        db.save(&r, SaveOptions::UNVALIDATED).unwrap();

        let stored = db.get(r.id).unwrap().unwrap();
        assert!(stored.progress.week);
        assert_eq!(db.fetch_all().unwrap().reminders.len(), 1);
    }

    #[test]
    fn validating_save_rejects_short_title() {
        let (_dir, db) = open_tmp();
        let owner = Owner::new("Ada", "ada@example.com");
        let r = reminder_for(&owner, "ab", 5);
        assert!(matches!(
            db.save(&r, SaveOptions::VALIDATED),
            Err(ReminderError::Validation { .. })
        ));
        db.save(&r, SaveOptions::UNVALIDATED).unwrap();
        assert!(db.get(r.id).unwrap().is_some());
    }

    #[test]
    fn delete_removes_and_reports() {
        let (_dir, db) = open_tmp();
        let owner = Owner::new("Ada", "ada@example.com");
        let r = reminder_for(&owner, "Dentist", 5);
        db.save(&r, SaveOptions::VALIDATED).unwrap();

        assert!(db.delete(r.id).unwrap());
        assert!(!db.delete(r.id).unwrap());
        assert!(db.fetch_all().unwrap().reminders.is_empty());
    }

    #[test]
    fn purge_keeps_owners_unless_asked() {
        let (_dir, db) = open_tmp();
        let owner = Owner::new("Ada", "ada@example.com");
        db.save_owner(&owner).unwrap();
        for title in ["One", "Two", "Three"] {
            db.save(&reminder_for(&owner, title, 5), SaveOptions::VALIDATED)
                .unwrap();
        }

        assert_eq!(db.purge(false).unwrap(), 3);
        assert!(db.fetch_all().unwrap().reminders.is_empty());
        assert_eq!(db.list_owners().unwrap().len(), 1);

        db.purge(true).unwrap();
        assert!(db.list_owners().unwrap().is_empty());
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("persist.db");
        let owner = Owner::new("Ada", "ada@example.com");
        let r = reminder_for(&owner, "Dentist", 5);
        {
            let db = ReminderDb::open(&path).unwrap();
            db.save_owner(&owner).unwrap();
            db.save(&r, SaveOptions::VALIDATED).unwrap();
        }
        let db = ReminderDb::open(&path).unwrap();
        let all = db.fetch_all().unwrap().reminders;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Dentist");
    }

    fn insert_raw(db: &ReminderDb, table: TableDefinition<Bytes, Bytes>, id: Uuid, raw: &str) {
        let wt = db.db.begin_write().unwrap();
        {
            let mut t = wt.open_table(table).unwrap();
            t.insert(id.as_bytes().as_slice(), raw.as_bytes()).unwrap();
        }
        wt.commit().unwrap();
    }

    #[test]
    fn undecodable_reminder_row_does_not_hide_the_rest() {
        let (_dir, db) = open_tmp();
        let owner = Owner::new("Ada", "ada@example.com");
        db.save_owner(&owner).unwrap();
        let good = reminder_for(&owner, "Dentist", 5);
        db.save(&good, SaveOptions::VALIDATED).unwrap();

        let broken = Uuid::new_v4();
        let raw = format!(
            r#"{{"id":"{broken}","title":"Broken","target_date":"2030-01-01T00:00:00Z","owner_id":"{}"}}"#,
            owner.id
        );
        insert_raw(&db, REMINDERS, broken, &raw);

        let fetched = db.fetch_all().unwrap();
        assert_eq!(fetched.reminders.len(), 1);
        assert_eq!(fetched.reminders[0].id, good.id);
        assert_eq!(fetched.unreadable.len(), 1);
        assert_eq!(fetched.unreadable[0].id, broken);
        assert_eq!(fetched.unreadable[0].title.as_deref(), Some("Broken"));
        assert!(fetched.unreadable[0].reason.contains("created_at"));

        // left in place for inspection
        assert_eq!(db.fetch_all().unwrap().unreadable.len(), 1);
    }

    #[test]
    fn undecodable_owner_row_leaves_owner_unresolved() {
        let (_dir, db) = open_tmp();
        let owner = Owner::new("Ada", "ada@example.com");
        insert_raw(&db, OWNERS, owner.id, "{not json");
        let r = reminder_for(&owner, "Dentist", 5);
        db.save(&r, SaveOptions::VALIDATED).unwrap();

        let fetched = db.fetch_all().unwrap();
        assert!(fetched.unreadable.is_empty());
        assert!(fetched.reminders[0].owner.is_none());
        assert!(db.get(r.id).unwrap().unwrap().owner.is_none());
        assert!(db.list_owners().unwrap().is_empty());
    }

    #[test]
    fn empty_db_fetch_returns_empty() {
        let (_dir, db) = open_tmp();
        assert!(db.fetch_all().unwrap().reminders.is_empty());
        assert_eq!(db.purge(true).unwrap(), 0);
    }
}
