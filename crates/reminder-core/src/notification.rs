use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ReminderError, Result};
use crate::types::Reminder;
use crate::window::Stage;

/// A rendered notification, ready for a sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub reminder_id: Uuid,
    pub stage: Stage,
    pub to: String,
    pub name: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Render the notification for `reminder` in window `stage`, `days` away.
    ///
    /// Fails when the reminder's owner was not resolved or its date is missing.
    pub fn render(
        reminder: &Reminder,
        stage: Stage,
        days: i64,
        offset: &FixedOffset,
    ) -> Result<Self> {
        let owner = reminder
            .owner
            .as_ref()
            .ok_or_else(|| ReminderError::OwnerNotFound(reminder.owner_id.to_string()))?;
        let target = reminder
            .target_date
            .ok_or_else(|| ReminderError::validation("target_date", "missing"))?;

        let body = format!(
            "Hi {}! We just wanted to remind you, that {} happens {}, on {}!",
            owner.name,
            reminder.title,
            relative_phrase(days),
            long_date(target, offset),
        );

        Ok(Self {
            reminder_id: reminder.id,
            stage,
            to: owner.email.clone(),
            name: owner.name.clone(),
            subject: reminder.title.clone(),
            body,
        })
    }
}

fn relative_phrase(days: i64) -> String {
    match days {
        d if d <= 0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d => format!("in {d} days"),
    }
}

/// "March 10, 2024"
fn long_date(date: DateTime<Utc>, offset: &FixedOffset) -> String {
    date.with_timezone(offset).format("%B %-d, %Y").to_string()
}
