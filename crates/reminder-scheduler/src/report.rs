//! Summary of one scheduling pass.

use std::fmt;

use chrono::{DateTime, Utc};
use reminder_core::{Action, Stage};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DispatchError;

/// What happened to one reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Skipped,
    Notified { stage: Stage },
    /// "Today" notification for a recurring reminder, followed by the rollover.
    NotifiedAndRolled { stage: Stage },
    Deleted,
    RolledForward { years: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemError {
    pub reminder_id: Uuid,
    pub title: String,
    pub action: Action,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub processed: usize,
    pub notified: usize,
    pub deleted: usize,
    pub rolled_forward: usize,
    pub skipped: usize,
    /// Reminders whose work was cut off by the pass deadline.
    pub unfinished: usize,
    pub timed_out: bool,
    /// Set when the reminder set could not be loaded at all.
    pub load_error: Option<String>,
    pub errors: Vec<ItemError>,
}

impl PassReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration_ms: 0,
            processed: 0,
            notified: 0,
            deleted: 0,
            rolled_forward: 0,
            skipped: 0,
            unfinished: 0,
            timed_out: false,
            load_error: None,
            errors: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        reminder_id: Uuid,
        title: &str,
        action: Action,
        result: Result<Outcome, DispatchError>,
    ) {
        match result {
            Ok(Outcome::Skipped) => self.skipped += 1,
            Ok(Outcome::Notified { .. }) => self.notified += 1,
            Ok(Outcome::NotifiedAndRolled { .. }) => {
                self.notified += 1;
                self.rolled_forward += 1;
            }
            Ok(Outcome::Deleted) => self.deleted += 1,
            Ok(Outcome::RolledForward { .. }) => self.rolled_forward += 1,
            Err(e) => self.errors.push(ItemError {
                reminder_id,
                title: title.to_string(),
                action,
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }

    /// True when every reminder was handled without error.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.load_error.is_none() && !self.timed_out
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(err) = &self.load_error {
            return write!(f, "pass aborted: could not load reminders: {err}");
        }
        write!(
            f,
            "pass finished in {}ms: {} processed, {} notified, {} deleted, {} rolled forward, {} skipped, {} errors",
            self.duration_ms,
            self.processed,
            self.notified,
            self.deleted,
            self.rolled_forward,
            self.skipped,
            self.errors.len(),
        )?;
        if self.timed_out {
            write!(f, " (timed out, {} unfinished)", self.unfinished)?;
        }
        for e in &self.errors {
            write!(
                f,
                "\n  - {} '{}' [{}]: {}",
                e.reminder_id, e.title, e.kind, e.message
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tallies_outcomes() {
        let mut r = PassReport::new(Utc::now());
        let id = Uuid::new_v4();
        r.record(id, "a", Action::Skip, Ok(Outcome::Skipped));
        r.record(
            id,
            "b",
            Action::Notify {
                stage: Stage::Today,
                days: 0,
            },
            Ok(Outcome::NotifiedAndRolled {
                stage: Stage::Today,
            }),
        );
        r.record(id, "c", Action::Delete, Ok(Outcome::Deleted));
        r.record(id, "d", Action::Quarantine, Err(DispatchError::MalformedDate));

        assert_eq!(r.skipped, 1);
        assert_eq!(r.notified, 1);
        assert_eq!(r.rolled_forward, 1);
        assert_eq!(r.deleted, 1);
        assert_eq!(r.errors.len(), 1);
        assert_eq!(r.errors[0].kind, "malformed_date");
        assert!(!r.is_clean());
    }

    #[test]
    fn display_lists_errors() {
        let mut r = PassReport::new(Utc::now());
        r.processed = 2;
        r.record(
            Uuid::nil(),
            "Dentist",
            Action::Quarantine,
            Err(DispatchError::MalformedDate),
        );
        let text = r.to_string();
        assert!(text.contains("2 processed"), "{text}");
        assert!(text.contains("1 errors"), "{text}");
        assert!(text.contains("'Dentist' [malformed_date]"), "{text}");
    }

    #[test]
    fn display_load_error() {
        let mut r = PassReport::new(Utc::now());
        r.load_error = Some("store error: locked".into());
        assert!(r.to_string().starts_with("pass aborted"));
        assert!(!r.is_clean());
    }

    #[test]
    fn serializes_to_json() {
        let mut r = PassReport::new(Utc::now());
        r.record(Uuid::nil(), "x", Action::Delete, Ok(Outcome::Deleted));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["deleted"], 1);
        assert_eq!(v["timed_out"], false);
    }
}
