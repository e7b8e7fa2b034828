use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{ReminderError, Result};
use crate::window::{self, Stage};

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 50;

/// Minimum lead time between creating a reminder and its target date.
pub const MIN_LEAD_HOURS: i64 = 24;

// ---------------------------------------------------------------------------
// Owner
// ---------------------------------------------------------------------------

/// The user a reminder belongs to. Only the delivery-relevant fields are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl Owner {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Per-window "already notified" flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub month: bool,
    #[serde(default)]
    pub week: bool,
    #[serde(default)]
    pub three_days: bool,
    #[serde(default)]
    pub one_day: bool,
    #[serde(default)]
    pub today: bool,
}

impl Progress {
    fn flag(&self, stage: Stage) -> Option<bool> {
        match stage {
            Stage::Month => Some(self.month),
            Stage::Week => Some(self.week),
            Stage::ThreeDays => Some(self.three_days),
            Stage::OneDay => Some(self.one_day),
            Stage::Today => Some(self.today),
            Stage::None | Stage::Expired => None,
        }
    }

    /// Whether the notification for `stage` has been sent.
    ///
    /// Stages without a flag (`None`, `Expired`) report `true` so callers never
    /// try to notify for them.
    pub fn is_sent(&self, stage: Stage) -> bool {
        self.flag(stage).unwrap_or(true)
    }

    /// Mark `stage` as sent. Returns `false` if the stage carries no flag.
    pub fn mark_sent(&mut self, stage: Stage) -> bool {
        let slot = match stage {
            Stage::Month => &mut self.month,
            Stage::Week => &mut self.week,
            Stage::ThreeDays => &mut self.three_days,
            Stage::OneDay => &mut self.one_day,
            Stage::Today => &mut self.today,
            Stage::None | Stage::Expired => return false,
        };
        *slot = true;
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn sent_count(&self) -> usize {
        [self.month, self.week, self.three_days, self.one_day, self.today]
            .iter()
            .filter(|f| **f)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Reminder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    /// `None` when the stored value is missing or cannot be parsed.
    #[serde(default, deserialize_with = "deserialize_lenient_date")]
    pub target_date: Option<DateTime<Utc>>,
    pub owner_id: Uuid,
    /// Resolved by the store on fetch; never persisted with the reminder.
    #[serde(skip)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub progress: Progress,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        title: impl Into<String>,
        target_date: DateTime<Utc>,
        owner_id: Uuid,
        recurring: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            target_date: Some(target_date),
            owner_id,
            owner: None,
            recurring,
            progress: Progress::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner_id = owner.id;
        self.owner = Some(owner);
        self
    }

    /// Advance the target date by one calendar year in `offset` and clear all
    /// progress flags. Both changes land together or not at all.
    pub fn roll_forward(&mut self, offset: &FixedOffset) -> Result<()> {
        let target = self
            .target_date
            .ok_or_else(|| ReminderError::validation("target_date", "missing"))?;
        let next = window::add_one_year(target, offset)?;
        self.target_date = Some(next);
        self.progress.reset();
        Ok(())
    }

    /// Field constraints enforced by validating saves.
    pub fn validate(&self) -> Result<()> {
        let title_len = self.title.trim().chars().count();
        if title_len < TITLE_MIN_CHARS {
            return Err(ReminderError::validation(
                "title",
                format!("must contain at least {TITLE_MIN_CHARS} characters"),
            ));
        }
        if title_len > TITLE_MAX_CHARS {
            return Err(ReminderError::validation(
                "title",
                format!("must contain at most {TITLE_MAX_CHARS} characters"),
            ));
        }

        let target = self
            .target_date
            .ok_or_else(|| ReminderError::validation("target_date", "must be specified"))?;
        if target <= self.created_at + Duration::hours(MIN_LEAD_HOURS) {
            return Err(ReminderError::validation(
                "target_date",
                format!("must be at least {MIN_LEAD_HOURS} hours after creation"),
            ));
        }
        Ok(())
    }
}

fn deserialize_lenient_date<'de, D>(d: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn reminder_at(target: DateTime<Utc>) -> Reminder {
        Reminder::new("Dentist", target, Uuid::new_v4(), false)
    }

    #[test]
    fn progress_mark_and_query() {
        let mut p = Progress::default();
        assert!(!p.is_sent(Stage::Week));
        assert!(p.mark_sent(Stage::Week));
        assert!(p.is_sent(Stage::Week));
        assert!(!p.is_sent(Stage::Month));
        assert_eq!(p.sent_count(), 1);
    }

    #[test]
    fn progress_flagless_stages() {
        let mut p = Progress::default();
        assert!(p.is_sent(Stage::None));
        assert!(p.is_sent(Stage::Expired));
        assert!(!p.mark_sent(Stage::Expired));
        assert_eq!(p, Progress::default());
    }

    #[test]
    fn roll_forward_advances_year_and_resets_flags() {
        let target = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let mut r = reminder_at(target);
        r.recurring = true;
        r.progress = Progress {
            month: true,
            week: true,
            three_days: true,
            one_day: true,
            today: true,
        };

        r.roll_forward(&utc()).unwrap();

        assert_eq!(
            r.target_date,
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap())
        );
        assert_eq!(r.progress, Progress::default());
    }

    #[test]
    fn roll_forward_without_date_is_an_error() {
        let mut r = reminder_at(Utc::now());
        r.target_date = None;
        r.progress.today = true;
        assert!(r.roll_forward(&utc()).is_err());
        assert!(r.progress.today, "flags must not reset on failure");
    }

    #[test]
    fn validate_title_bounds() {
        let mut r = reminder_at(Utc::now() + Duration::days(3));
        r.title = "  ab  ".into();
        assert!(r.validate().is_err());
        r.title = "x".repeat(51);
        assert!(r.validate().is_err());
        r.title = "abc".into();
        assert!(r.validate().is_ok());
    }

    #[test]
    fn validate_requires_lead_time() {
        let r = reminder_at(Utc::now() + Duration::hours(2));
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("target_date"), "{err}");
    }

    #[test]
    fn unparsable_date_loads_as_none() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "title": "Broken",
            "target_date": "next tuesday",
            "owner_id": Uuid::new_v4(),
            "created_at": "2024-01-01T00:00:00Z"
        });
        let r: Reminder = serde_json::from_value(json).unwrap();
        assert!(r.target_date.is_none());
        assert!(!r.recurring);
        assert_eq!(r.progress, Progress::default());
    }

    #[test]
    fn owner_is_not_persisted() {
        let owner = Owner::new("Ada", "ada@example.com");
        let r = reminder_at(Utc::now()).with_owner(owner.clone());
        let json = serde_json::to_string(&r).unwrap();
        assert!(!json.contains("ada@example.com"));
        let back: Reminder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.owner_id, owner.id);
        assert!(back.owner.is_none());
    }
}
